pub mod custom_format;
pub mod definition;
pub mod profile;

pub use custom_format::{CustomFormat, FormatRule, RuleKind, score_release};
pub use definition::{QualityDefinition, QualityLadder, extract_resolution, normalize_group};
pub use profile::{ProfileItem, ProfileMediaType, ProperFlags, QualityProfile};
