//! Static frontend embedded into the binary

use rust_embed::RustEmbed;
use std::borrow::Cow;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Frontend;

/// The single-page frontend served at `/`
pub fn index_html() -> Option<Cow<'static, [u8]>> {
    Frontend::get("index.html").map(|file| file.data)
}
