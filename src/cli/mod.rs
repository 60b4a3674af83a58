pub mod app;
pub mod apply;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod extract;
pub mod matching;
pub mod output;
pub mod runtime;
pub mod serve;
pub mod sites;

pub use apply::{cmd_apply, ApplyArgs};
pub use extract::{cmd_extract, ExtractArgs};
pub use matching::{cmd_match, MatchArgs};
pub use serve::{answer_line, cmd_serve, ServeArgs};
pub use sites::cmd_sites;
