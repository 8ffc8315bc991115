//! Image pipeline for quote posts.
//!
//! - [`composer`] - Card, gradient and poster rendering to JPEG
//! - [`font`] - Bitmap font used for captions
//! - [`ai_image`] - ComfyUI and Stable Horde background generation
//! - [`prompt`] - Background prompt built from the post text

pub mod ai_image;
pub mod composer;
pub mod font;
pub mod prompt;

pub use ai_image::{BackgroundGenerator, ComfyClient, HordeClient, ImageBackend};
pub use composer::{CardComposer, CardStyle};
pub use prompt::build_background_prompt;
