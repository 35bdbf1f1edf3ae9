//! # Protocol Constants
//!
//! Names and defaults shared by the music generation command protocol.

/// Exchange that golem skill commands are published on
pub const SKILL_EXCHANGE: &str = "golem_skill";

/// Command understood by music generation workers
pub const GENERATE_MUSIC_COMMAND: &str = "generate_music_wav";

/// Capability type workers register under
pub const MUSIC_GENERATION_CAPABILITY: &str = "music_generation";

/// Header that carries the correlation key in both directions
pub const CORRELATION_HEADER: &str = "socket_id";

/// Stored configuration group holding operator defaults
pub const MUSIC_CONFIG_GROUP: &str = "chat_ability/music_generation";

/// Message shown to the user when no worker can take the command
pub const NO_MUSIC_GENERATORS_MESSAGE: &str = "No music generators are currently running.";

/// Shown when a generation fails and there is no worker error text to report
pub const GENERATION_FAILED_MESSAGE: &str = "Music generation failed.";

/// Payload field names
pub mod fields {
    pub const PROMPT: &str = "prompt";
    pub const LENGTH_IN_SECONDS: &str = "length_in_seconds";
    pub const GUIDANCE_SCALE: &str = "guidance_scale";
    pub const SECONDS: &str = "seconds";
    pub const PROGRESS: &str = "progress";
}

/// Built-in payload defaults and ceilings
pub mod defaults {
    pub const LENGTH_IN_SECONDS: u64 = 10;
    pub const GUIDANCE_SCALE: u64 = 3;
    pub const MAX_LENGTH_IN_SECONDS: f64 = 30.0;
    pub const MAX_GUIDANCE_SCALE: f64 = 5.0;
    pub const COMPLETION_TIMEOUT_SECONDS: u64 = 300;
}

/// Completion message layout
pub mod completion {
    pub const SUCCESS_HEADER: &str = "success";
    pub const ERRORS_HEADER: &str = "errors";
    pub const CONTENT_FIELD: &str = "wav";
    pub const ERROR_SEPARATOR: &str = "<br/>";
}

/// Artifact naming and presentation
pub mod artifact {
    pub const FILE_PREFIX: &str = "music-";
    pub const FILE_EXTENSION: &str = "wav";
    pub const MIME_TYPE: &str = "audio/wav";
    pub const BACKGROUND_ASSET: &str = "asset/chat-ability/music-generator/music-background.jpg";
}
