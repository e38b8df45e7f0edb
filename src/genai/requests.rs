//! Request bodies for each kind of call, and extraction of their results.

use crate::genai::client::GenAiError;
use crate::genai::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig,
    PredictLongRunningRequest, PrebuiltVoiceConfig, SpeechConfig, VideoInstance,
    VideoParameters, VoiceConfig,
};

/// Instruction prepended to every text sent for speech synthesis.
pub const SPEECH_INSTRUCTION: &str = "Say professionally:";

/// Plain text generation.
pub fn text_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(prompt)],
        generation_config: None,
    }
}

/// Image generation from a scene description.
pub fn image_request(description: &str, aspect_ratio: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(description)],
        generation_config: Some(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: aspect_ratio.to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// Text generation constrained to JSON matching `schema`.
pub fn structured_request(prompt: &str, schema: serde_json::Value) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(prompt)],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Default::default()
        }),
    }
}

/// Audio-only speech synthesis with one prebuilt voice.
pub fn speech_request(text: &str, voice: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(format!("{} {}", SPEECH_INSTRUCTION, text))],
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.to_string(),
                    },
                },
            }),
            ..Default::default()
        }),
    }
}

/// Settings for a video job. One video per job.
#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub resolution: String,
    pub aspect_ratio: String,
}

pub fn video_request(prompt: &str, settings: &VideoSettings) -> PredictLongRunningRequest {
    PredictLongRunningRequest {
        instances: vec![VideoInstance {
            prompt: prompt.to_string(),
        }],
        parameters: VideoParameters {
            sample_count: 1,
            resolution: settings.resolution.clone(),
            aspect_ratio: settings.aspect_ratio.clone(),
        },
    }
}

/// Data URI of the first inline image, or `""` when the response has none.
///
/// Callers treat the empty string as "no image produced".
pub fn image_locator(response: &GenerateContentResponse) -> String {
    match response.first_inline_data() {
        Some(inline) => format!("data:{};base64,{}", inline.mime_type, inline.data),
        None => String::new(),
    }
}

/// Base64 audio of the first inline part.
pub fn speech_payload(response: &GenerateContentResponse) -> Result<String, GenAiError> {
    response
        .first_inline_data()
        .map(|inline| inline.data.clone())
        .filter(|data| !data.is_empty())
        .ok_or(GenAiError::NoAudio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::types::{Candidate, InlineData, Part};

    fn response_with(parts: Vec<Part>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content { role: Some("model".into()), parts }),
                finish_reason: None,
            }],
            prompt_feedback: None,
        }
    }

    fn inline(mime: &str, data: &str) -> Part {
        Part {
            text: None,
            inline_data: Some(InlineData { mime_type: mime.into(), data: data.into() }),
        }
    }

    #[test]
    fn test_image_locator_is_data_uri() {
        let response = response_with(vec![Part::text("Here you go"), inline("image/png", "AAAA")]);
        assert_eq!(image_locator(&response), "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_image_locator_empty_without_inline_part() {
        let response = response_with(vec![Part::text("I cannot draw that")]);
        assert_eq!(image_locator(&response), "");
        assert_eq!(image_locator(&GenerateContentResponse::default()), "");
    }

    #[test]
    fn test_speech_payload_requires_audio() {
        let response = response_with(vec![inline("audio/L16;codec=pcm;rate=24000", "AQID")]);
        assert_eq!(speech_payload(&response).unwrap(), "AQID");

        let response = response_with(vec![Part::text("no audio here")]);
        assert!(matches!(speech_payload(&response), Err(GenAiError::NoAudio)));
    }

    #[test]
    fn test_speech_request_shape() {
        let json = serde_json::to_value(speech_request("Hello there", "Kore")).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Say professionally: Hello there");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn test_video_request_shape() {
        let settings = VideoSettings { resolution: "720p".into(), aspect_ratio: "16:9".into() };
        let json = serde_json::to_value(video_request("A lighthouse at dusk", &settings)).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "A lighthouse at dusk");
        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["resolution"], "720p");
        assert_eq!(json["parameters"]["aspectRatio"], "16:9");
    }
}
