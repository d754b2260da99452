//! Names, synthesized email addresses and candidate lookup.

mod email;
mod names;
mod resolver;

pub use self::email::{build_email, scrub_email_address, STRIPPED_EMAIL_CHARS};
pub use self::names::{
    parse_display_name, parse_profile_name, NameParts, NameRule, DISPLAY_NAME_RULES,
    PROFILE_NAME_RULES,
};
pub use self::resolver::{CandidateSet, NameResolver, ResolutionTier};
