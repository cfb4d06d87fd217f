/// Captioning models the backend is known to serve. The backend listing does
/// not carry prompts, so defaults for these keys are kept here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownModel {
    Qwen2Vl,
    OmniVinci,
    Qwen3Omni,
    Qwen3OmniCaptioner,
}

pub struct ModelPreset {
    pub key: &'static str,
    pub display_name: &'static str,
    pub default_prompt: &'static str,
    pub accepts_prompt: bool,
}

pub const FALLBACK_DEFAULT_MODEL: &str = "qwen2vl";

impl KnownModel {
    pub const ALL: [KnownModel; 4] = [
        KnownModel::Qwen2Vl,
        KnownModel::OmniVinci,
        KnownModel::Qwen3Omni,
        KnownModel::Qwen3OmniCaptioner,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.preset().key == key)
    }

    pub fn preset(&self) -> ModelPreset {
        match self {
            KnownModel::Qwen2Vl => ModelPreset {
                key: "qwen2vl",
                display_name: "Qwen2-VL-7B",
                default_prompt: "Describe what you see in this video, including actions, objects, and any visible text on screen.",
                accepts_prompt: true,
            },
            KnownModel::OmniVinci => ModelPreset {
                key: "omnivinci",
                display_name: "OmniVinci",
                default_prompt: "Describe this video including both visual content and audio track. Mention any speech, music, sounds, or audio details you detect.",
                accepts_prompt: true,
            },
            KnownModel::Qwen3Omni => ModelPreset {
                key: "qwen3omni",
                display_name: "Qwen3-Omni-30B",
                default_prompt: "Analyze this video comprehensively. Describe the visual content, audio elements, context, and explain the meaning or story. Include detailed reasoning about what's happening and why.",
                accepts_prompt: true,
            },
            KnownModel::Qwen3OmniCaptioner => ModelPreset {
                key: "qwen3omni_captioner",
                display_name: "Qwen3-Omni-Captioner",
                default_prompt: "",
                accepts_prompt: false,
            },
        }
    }
}
