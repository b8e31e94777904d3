//! Document content model and preview rendering
//!
//! - `envelope`: the structured bundle stored in a module's `content` column
//! - `attachment`: decides whether a body is literal text or a linked file
//! - `preview`: HTML facsimile of the printed page

pub mod attachment;
pub mod envelope;
pub mod preview;

pub use attachment::{classify_body, AttachmentKind, BodyContent};
pub use envelope::{ContentEnvelope, Stamp};
pub use preview::{render_preview, PaperFormat};
