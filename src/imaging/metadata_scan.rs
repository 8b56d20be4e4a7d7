//! Minimal scanner for auxiliary metadata in JPEG, PNG and GIF streams.
//!
//! Reports *which* non-pixel segments a file carries, not their contents:
//!
//! | Format | Segments reported |
//! |---|---|
//! | JPEG | APP1 Exif, APP1 XMP, APP13 Photoshop/IPTC, APP2 ICC profile, COM |
//! | PNG | `eXIf`, `tEXt`, `zTXt`, `iTXt` (XMP when keyed `XML:com.adobe.xmp`), `iCCP`, `tIME` |
//! | GIF | comment extension, application extensions other than animation loop control |
//!
//! Used by the CLI `inspect` command and to count what a sanitize pass
//! stripped. Malformed input yields whatever was found before the damage.

use serde::Serialize;

/// Kind of auxiliary (non-pixel) data found in an image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKind {
    Exif,
    Xmp,
    Iptc,
    IccProfile,
    Comment,
    Text,
    Timestamp,
    Application,
}

impl MetadataKind {
    pub fn label(self) -> &'static str {
        match self {
            MetadataKind::Exif => "Exif",
            MetadataKind::Xmp => "XMP",
            MetadataKind::Iptc => "IPTC",
            MetadataKind::IccProfile => "ICC profile",
            MetadataKind::Comment => "comment",
            MetadataKind::Text => "text",
            MetadataKind::Timestamp => "timestamp",
            MetadataKind::Application => "application data",
        }
    }
}

/// One metadata segment: its kind and payload length in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetadataSegment {
    pub kind: MetadataKind,
    pub len: usize,
}

/// Scan an encoded image for metadata segments, dispatching on magic bytes.
pub fn scan_metadata(data: &[u8]) -> Vec<MetadataSegment> {
    if data.starts_with(&[0xFF, 0xD8]) {
        scan_jpeg(data)
    } else if data.starts_with(PNG_SIGNATURE) {
        scan_png(data)
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        scan_gif(data)
    } else {
        Vec::new()
    }
}

fn be_u16(data: &[u8], pos: usize) -> Option<usize> {
    let bytes = data.get(pos..pos + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
}

fn be_u32(data: &[u8], pos: usize) -> Option<usize> {
    let bytes = data.get(pos..pos + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

// ---------------------------------------------------------------------------
// JPEG: marker segments up to start-of-scan
// ---------------------------------------------------------------------------

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";

fn classify_jpeg_segment(marker: u8, payload: &[u8]) -> Option<MetadataKind> {
    match marker {
        0xE1 if payload.starts_with(EXIF_HEADER) => Some(MetadataKind::Exif),
        0xE1 if payload.starts_with(XMP_HEADER) || payload.starts_with(XMP_EXTENSION_HEADER) => {
            Some(MetadataKind::Xmp)
        }
        0xE2 if payload.starts_with(ICC_HEADER) => Some(MetadataKind::IccProfile),
        0xED => Some(MetadataKind::Iptc),
        0xFE => Some(MetadataKind::Comment),
        _ => None,
    }
}

fn scan_jpeg(data: &[u8]) -> Vec<MetadataSegment> {
    let mut found = Vec::new();
    let mut pos = 2; // past SOI

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // Fill bytes between markers
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // SOS (0xDA) means entropy-coded data starts; EOI ends the stream
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        // Markers without length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let Some(seg_len) = be_u16(data, pos + 2) else {
            break;
        };
        if seg_len < 2 {
            break;
        }
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        let payload = &data[seg_start.min(seg_end)..seg_end];

        if let Some(kind) = classify_jpeg_segment(marker, payload) {
            found.push(MetadataSegment {
                kind,
                len: payload.len(),
            });
        }
        pos += 2 + seg_len;
    }

    found
}

// ---------------------------------------------------------------------------
// PNG: length-type-data-crc chunks up to IEND
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const XMP_ITXT_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";

fn scan_png(data: &[u8]) -> Vec<MetadataSegment> {
    let mut found = Vec::new();
    let mut pos = PNG_SIGNATURE.len();

    while let Some(len) = be_u32(data, pos) {
        let Some(chunk_type) = data.get(pos + 4..pos + 8) else {
            break;
        };
        let body_start = pos + 8;
        let body_end = (body_start + len).min(data.len());
        let body = &data[body_start.min(body_end)..body_end];

        let kind = match chunk_type {
            b"eXIf" => Some(MetadataKind::Exif),
            b"iTXt" if body.starts_with(XMP_ITXT_KEYWORD) => Some(MetadataKind::Xmp),
            b"tEXt" | b"zTXt" | b"iTXt" => Some(MetadataKind::Text),
            b"iCCP" => Some(MetadataKind::IccProfile),
            b"tIME" => Some(MetadataKind::Timestamp),
            _ => None,
        };
        if let Some(kind) = kind {
            found.push(MetadataSegment {
                kind,
                len: body.len(),
            });
        }
        if chunk_type == b"IEND" {
            break;
        }
        // length + type + body + crc
        pos = body_start + len + 4;
    }

    found
}

// ---------------------------------------------------------------------------
// GIF: extension blocks between header and trailer
// ---------------------------------------------------------------------------

/// Application identifiers that only control animation, not metadata.
const LOOP_CONTROL_APPS: &[&[u8]] = &[b"NETSCAPE2.0", b"ANIMEXTS1.0"];
const GIF_XMP_APP: &[u8] = b"XMP DataXMP";

/// Skip a chain of data sub-blocks starting at `pos`.
///
/// Returns the position after the terminator, the total payload length and
/// the first sub-block's contents.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Option<(usize, usize, &[u8])> {
    let mut total = 0;
    let mut first: Option<&[u8]> = None;
    loop {
        let size = *data.get(pos)? as usize;
        pos += 1;
        if size == 0 {
            return Some((pos, total, first.unwrap_or(&[])));
        }
        let block = data.get(pos..pos + size)?;
        first.get_or_insert(block);
        total += size;
        pos += size;
    }
}

fn color_table_len(packed: u8) -> usize {
    if packed & 0x80 != 0 {
        3 * (1 << ((packed & 0x07) + 1))
    } else {
        0
    }
}

fn scan_gif(data: &[u8]) -> Vec<MetadataSegment> {
    let mut found = Vec::new();
    // Header (6) + logical screen descriptor (7)
    let Some(&packed) = data.get(10) else {
        return found;
    };
    let mut pos = 13 + color_table_len(packed);

    while let Some(&introducer) = data.get(pos) {
        match introducer {
            // Extension
            0x21 => {
                let Some(&label) = data.get(pos + 1) else {
                    break;
                };
                let Some((next, total, first)) = skip_sub_blocks(data, pos + 2) else {
                    break;
                };
                let kind = match label {
                    0xFE => Some(MetadataKind::Comment),
                    0xFF if LOOP_CONTROL_APPS.contains(&first) => None,
                    0xFF if first == GIF_XMP_APP => Some(MetadataKind::Xmp),
                    0xFF => Some(MetadataKind::Application),
                    _ => None,
                };
                if let Some(kind) = kind {
                    found.push(MetadataSegment { kind, len: total });
                }
                pos = next;
            }
            // Image descriptor: 9 bytes, optional local table, LZW size, data
            0x2C => {
                let Some(&local_packed) = data.get(pos + 9) else {
                    break;
                };
                let lzw_pos = pos + 10 + color_table_len(local_packed);
                let Some((next, _, _)) = skip_sub_blocks(data, lzw_pos + 1) else {
                    break;
                };
                pos = next;
            }
            // Trailer, or anything unexpected
            _ => break,
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_image, jpeg_bytes, png_bytes, with_jpeg_segment};

    #[test]
    fn unknown_format_has_no_segments() {
        assert!(scan_metadata(b"hello world").is_empty());
        assert!(scan_metadata(&[]).is_empty());
    }

    #[test]
    fn plain_encoder_jpeg_is_clean() {
        let jpeg = jpeg_bytes(&gradient_image(16, 16), 90);
        assert!(scan_metadata(&jpeg).is_empty());
    }

    #[test]
    fn jpeg_exif_and_comment_detected() {
        let jpeg = jpeg_bytes(&gradient_image(16, 16), 90);
        let mut exif = EXIF_HEADER.to_vec();
        exif.extend_from_slice(b"MM\0\x2a\0\0\0\x08GPS");
        let with_exif = with_jpeg_segment(&jpeg, 0xE1, &exif);
        let tagged = with_jpeg_segment(&with_exif, 0xFE, b"shot on my phone");

        let segments = scan_metadata(&tagged);
        assert_eq!(
            segments,
            vec![
                MetadataSegment {
                    kind: MetadataKind::Comment,
                    len: 16
                },
                MetadataSegment {
                    kind: MetadataKind::Exif,
                    len: exif.len()
                },
            ]
        );
    }

    #[test]
    fn jpeg_xmp_iptc_icc_detected() {
        let jpeg = jpeg_bytes(&gradient_image(8, 8), 90);
        let mut xmp = XMP_HEADER.to_vec();
        xmp.extend_from_slice(b"<x:xmpmeta/>");
        let mut icc = ICC_HEADER.to_vec();
        icc.extend_from_slice(&[1, 1, 0, 0]);

        let tagged = with_jpeg_segment(&jpeg, 0xE1, &xmp);
        let tagged = with_jpeg_segment(&tagged, 0xED, b"Photoshop 3.0\08BIM");
        let tagged = with_jpeg_segment(&tagged, 0xE2, &icc);

        let kinds: Vec<MetadataKind> = scan_metadata(&tagged).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![MetadataKind::IccProfile, MetadataKind::Iptc, MetadataKind::Xmp]
        );
    }

    #[test]
    fn jpeg_unrelated_app1_ignored() {
        let jpeg = jpeg_bytes(&gradient_image(8, 8), 90);
        let tagged = with_jpeg_segment(&jpeg, 0xE1, b"SomethingElse\0");
        assert!(scan_metadata(&tagged).is_empty());
    }

    #[test]
    fn truncated_jpeg_does_not_panic() {
        let jpeg = jpeg_bytes(&gradient_image(8, 8), 90);
        let tagged = with_jpeg_segment(&jpeg, 0xFE, b"a comment that gets cut");
        for cut in 0..tagged.len().min(64) {
            let _ = scan_metadata(&tagged[..cut]);
        }
    }

    /// Insert a PNG chunk right after IHDR. CRC is zeroed; the scanner ignores it.
    fn with_png_chunk(png: &[u8], chunk_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
        // signature (8) + IHDR chunk (4 + 4 + 13 + 4)
        let split = 8 + 25;
        let mut out = png[..split].to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(body);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&png[split..]);
        out
    }

    #[test]
    fn plain_encoder_png_is_clean() {
        let png = png_bytes(&gradient_image(16, 16));
        assert!(scan_metadata(&png).is_empty());
    }

    #[test]
    fn png_text_chunks_detected() {
        let png = png_bytes(&gradient_image(16, 16));
        let tagged = with_png_chunk(&png, b"tEXt", b"Author\0me");
        let tagged = with_png_chunk(&tagged, b"eXIf", b"MM\0\x2a");
        let tagged = with_png_chunk(&tagged, b"iTXt", b"XML:com.adobe.xmp\0\0\0\0\0<x/>");

        let kinds: Vec<MetadataKind> = scan_metadata(&tagged).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![MetadataKind::Xmp, MetadataKind::Exif, MetadataKind::Text]
        );
    }

    /// Minimal 1x1 GIF89a with an optional extension block before the image.
    fn tiny_gif(extension: Option<(u8, &[u8])>) -> Vec<u8> {
        let mut gif = b"GIF89a".to_vec();
        // 1x1, global color table of 2 entries
        gif.extend_from_slice(&[1, 0, 1, 0, 0x80, 0, 0]);
        gif.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        if let Some((label, body)) = extension {
            gif.extend_from_slice(&[0x21, label, body.len() as u8]);
            gif.extend_from_slice(body);
            gif.push(0);
        }
        // Image descriptor, no local table, LZW min size 2, one data block
        gif.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0]);
        gif.extend_from_slice(&[2, 2, 0x44, 0x01, 0]);
        gif.push(0x3B);
        gif
    }

    #[test]
    fn gif_comment_detected() {
        let gif = tiny_gif(Some((0xFE, b"hello")));
        assert_eq!(
            scan_metadata(&gif),
            vec![MetadataSegment {
                kind: MetadataKind::Comment,
                len: 5
            }]
        );
    }

    #[test]
    fn gif_loop_extension_not_metadata() {
        let gif = tiny_gif(Some((0xFF, b"NETSCAPE2.0")));
        assert!(scan_metadata(&gif).is_empty());
        assert!(scan_metadata(&tiny_gif(None)).is_empty());
    }

    #[test]
    fn gif_xmp_and_other_applications_detected() {
        let xmp = tiny_gif(Some((0xFF, b"XMP DataXMP")));
        assert_eq!(scan_metadata(&xmp)[0].kind, MetadataKind::Xmp);
        let app = tiny_gif(Some((0xFF, b"ICCRGBG1012")));
        assert_eq!(scan_metadata(&app)[0].kind, MetadataKind::Application);
    }
}
