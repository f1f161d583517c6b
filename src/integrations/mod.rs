//! Built-in integrations
//!
//! Each integration owns its outward API calls; all of them share the
//! blocking HTTP helper in [`http`].

pub mod http;
pub mod hubspot;
pub mod mailchimp;
