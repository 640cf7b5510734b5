#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    JPEG,
    PNG,
    GIF,
    WebP,
    SVG,
    BMP,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl ImageFormat {
    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::JPEG => &["jpg", "jpeg"],
            Self::PNG => &["png"],
            Self::GIF => &["gif"],
            Self::WebP => &["webp"],
            Self::SVG => &["svg"],
            Self::BMP => &["bmp"],
        }
    }

    /// Get the primary extension for this format
    pub fn primary_extension(&self) -> &str {
        self.extensions()[0]
    }

    /// Identify a buffer by its leading magic bytes.
    ///
    /// Codecs use this rather than the file name, since every adapter in a
    /// pipeline sees every file and must pass foreign formats through untouched.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::PNG);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::JPEG);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::GIF);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        if bytes.starts_with(b"BM") {
            return Some(Self::BMP);
        }
        if is_svg(bytes) {
            return Some(Self::SVG);
        }
        None
    }
}

/// True when the first element of an XML document is `<svg`.
///
/// A leading BOM, the XML declaration, processing instructions, comments, and
/// a DOCTYPE (internal subset included) may precede it, at any length.
fn is_svg(bytes: &[u8]) -> bool {
    let mut rest = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    loop {
        rest = rest.trim_ascii_start();
        let skipped = if rest.starts_with(b"<?") {
            skip_past(rest, b"?>")
        } else if rest.starts_with(b"<!--") {
            skip_past(rest, b"-->")
        } else if starts_with_ignore_case(rest, b"<!DOCTYPE") {
            skip_doctype(rest)
        } else {
            return is_svg_open_tag(rest);
        };
        match skipped {
            Some(after) => rest = after,
            None => return false,
        }
    }
}

fn is_svg_open_tag(bytes: &[u8]) -> bool {
    match bytes.strip_prefix(b"<svg") {
        Some(after) => matches!(after.first(), Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/'),
        None => false,
    }
}

fn skip_doctype(bytes: &[u8]) -> Option<&[u8]> {
    let close = bytes.iter().position(|&b| b == b'>')?;
    match bytes[..close].iter().position(|&b| b == b'[') {
        Some(open) => skip_past(skip_past(&bytes[open..], b"]")?, b">"),
        None => Some(&bytes[close + 1..]),
    }
}

fn skip_past<'a>(bytes: &'a [u8], terminator: &[u8]) -> Option<&'a [u8]> {
    bytes
        .windows(terminator.len())
        .position(|w| w == terminator)
        .map(|at| &bytes[at + terminator.len()..])
}

fn starts_with_ignore_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}
