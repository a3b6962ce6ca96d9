// Lenient reader for PNG text chunks (tEXt, zTXt, iTXt)
//
// A malformed text chunk never fails the file: it is repaired when the
// keyword survives, skipped otherwise, and logged at debug level.

use flate2::read::ZlibDecoder;
use std::io::{self, Read};
use tracing::debug;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Largest decompressed zTXt/iTXt payload that is accepted.
pub const MAX_TEXT_CHUNK: u64 = 1024 * 1024;

/// Walk the chunks before the first `IDAT` and return every readable text
/// entry as `(keyword, text)`, in file order.
///
/// A stream that ends early just ends the walk; only real read failures are
/// returned as errors.
pub fn read_text_chunks<R: Read>(mut reader: R) -> io::Result<Vec<(String, String)>> {
    let mut signature = [0u8; 8];
    if !read_fully(&mut reader, &mut signature)? || signature != PNG_SIGNATURE {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();

    loop {
        let mut header = [0u8; 8];
        if !read_fully(&mut reader, &mut header)? {
            debug!("Chunk stream ended before IDAT");
            break;
        }
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let kind = [header[4], header[5], header[6], header[7]];

        if &kind == b"IDAT" || &kind == b"IEND" {
            break;
        }

        let mut data = Vec::new();
        (&mut reader).take(length).read_to_end(&mut data)?;
        if (data.len() as u64) < length {
            debug!(
                "Truncated {} chunk ({} of {} bytes)",
                String::from_utf8_lossy(&kind),
                data.len(),
                length
            );
            break;
        }

        let entry = match &kind {
            b"tEXt" => parse_text(&data),
            b"zTXt" => parse_compressed_text(&data),
            b"iTXt" => parse_international_text(&data),
            _ => None,
        };
        entries.extend(entry);

        let mut crc = [0u8; 4];
        if !read_fully(&mut reader, &mut crc)? {
            break;
        }
    }

    Ok(entries)
}

/// `read_exact` that reports a clean end of stream as `false`.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Split at the first NUL. Without one, the whole chunk is the keyword and
/// the rest is empty.
fn split_keyword(data: &[u8]) -> (&[u8], &[u8]) {
    match data.iter().position(|&b| b == 0) {
        Some(nul) => (&data[..nul], &data[nul + 1..]),
        None => (data, &[]),
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// tEXt/zTXt payloads are Latin-1 on paper, but generators routinely write
/// UTF-8 into them. Valid UTF-8 is read as UTF-8, anything else as Latin-1.
pub fn decode_text_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(utf8) => utf8.to_string(),
        Err(_) => latin1(bytes),
    }
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed)
        .take(MAX_TEXT_CHUNK + 1)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 > MAX_TEXT_CHUNK {
        return Err(format!("decompressed text exceeds {} bytes", MAX_TEXT_CHUNK));
    }
    Ok(out)
}

fn parse_text(data: &[u8]) -> Option<(String, String)> {
    let (keyword, text) = split_keyword(data);
    if keyword.is_empty() {
        debug!("Skipping tEXt chunk with an empty keyword");
        return None;
    }
    if keyword.len() == data.len() {
        debug!("tEXt chunk '{}' has no separator, keeping it with an empty value", latin1(keyword));
    }
    Some((latin1(keyword), decode_text_bytes(text)))
}

fn parse_compressed_text(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data);
    if keyword.is_empty() {
        debug!("Skipping zTXt chunk with an empty keyword");
        return None;
    }
    let keyword = latin1(keyword);

    let Some((&method, compressed)) = rest.split_first() else {
        debug!("Skipping zTXt chunk '{}' without compressed data", keyword);
        return None;
    };
    if method != 0 {
        debug!("Skipping zTXt chunk '{}' with compression method {}", keyword, method);
        return None;
    }

    match inflate(compressed) {
        Ok(text) => Some((keyword, decode_text_bytes(&text))),
        Err(e) => {
            debug!("Skipping unreadable zTXt chunk '{}': {}", keyword, e);
            None
        }
    }
}

fn parse_international_text(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data);
    if keyword.is_empty() {
        debug!("Skipping iTXt chunk with an empty keyword");
        return None;
    }
    let keyword = latin1(keyword);

    let [flag, method, tail @ ..] = rest else {
        debug!("Skipping iTXt chunk '{}' without compression fields", keyword);
        return None;
    };
    // language tag, then translated keyword, each NUL-terminated
    let Some(text) = tail
        .splitn(3, |&b| b == 0)
        .nth(2)
    else {
        debug!("Skipping iTXt chunk '{}' without language fields", keyword);
        return None;
    };

    let bytes = match (flag, method) {
        (0, _) => text.to_vec(),
        (1, 0) => match inflate(text) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Skipping unreadable iTXt chunk '{}': {}", keyword, e);
                return None;
            }
        },
        _ => {
            debug!("Skipping iTXt chunk '{}' with compression {}/{}", keyword, flag, method);
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(text) => Some((keyword, text)),
        Err(_) => {
            debug!("Skipping iTXt chunk '{}' with invalid UTF-8", keyword);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out
    }

    fn stream(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        for c in chunks {
            out.extend_from_slice(c);
        }
        out
    }

    #[test]
    fn test_utf8_written_into_latin1_chunk_is_recovered() {
        assert_eq!(decode_text_bytes("café".as_bytes()), "café");
    }

    #[test]
    fn test_genuine_latin1_is_kept() {
        assert_eq!(decode_text_bytes(b"caf\xe9"), "caf\u{e9}");
        assert_eq!(decode_text_bytes(b"plain ascii"), "plain ascii");
    }

    #[test]
    fn test_text_without_separator_keeps_keyword() {
        assert_eq!(parse_text(b"orphan"), Some(("orphan".to_string(), String::new())));
        assert_eq!(parse_text(b"\0value"), None);

        let long = "k".repeat(90);
        assert_eq!(
            parse_text(format!("{long}\0v").as_bytes()),
            Some((long, "v".to_string()))
        );
    }

    #[test]
    fn test_compressed_text() {
        let mut data = b"workflow\0\0".to_vec();
        data.extend(zlib(b"{\"nodes\": []}"));
        assert_eq!(
            parse_compressed_text(&data),
            Some(("workflow".to_string(), "{\"nodes\": []}".to_string()))
        );

        assert_eq!(parse_compressed_text(b"workflow\0\0not zlib"), None);
        assert_eq!(parse_compressed_text(b"workflow\0"), None);
        assert_eq!(parse_compressed_text(b"workflow\0\x01abc"), None);
    }

    #[test]
    fn test_compressed_text_over_limit_is_skipped() {
        let mut data = b"big\0\0".to_vec();
        data.extend(zlib(&vec![b'a'; MAX_TEXT_CHUNK as usize + 1]));
        assert_eq!(parse_compressed_text(&data), None);
    }

    #[test]
    fn test_international_text() {
        assert_eq!(
            parse_international_text("Comment\0\0\0en\0Kommentar\0héllo".as_bytes()),
            Some(("Comment".to_string(), "héllo".to_string()))
        );

        let mut data = b"prompt\0\x01\0\0\0".to_vec();
        data.extend(zlib("猫".as_bytes()));
        assert_eq!(
            parse_international_text(&data),
            Some(("prompt".to_string(), "猫".to_string()))
        );

        assert_eq!(parse_international_text(b"prompt\0\0\0no-language-end"), None);
        assert_eq!(parse_international_text(b"prompt\0"), None);
        assert_eq!(parse_international_text(b"prompt\0\0\0\0\0\xff\xfe"), None);
    }

    #[test]
    fn test_walk_stops_at_image_data() {
        let bytes = stream(&[
            chunk(b"IHDR", &[0; 13]),
            chunk(b"tEXt", b"\0skipped"),
            chunk(b"tEXt", b"parameters\0Positive prompt: a cat"),
            chunk(b"IDAT", &[1, 2, 3]),
            chunk(b"tEXt", b"late\0after pixels"),
        ]);

        let entries = read_text_chunks(bytes.as_slice()).unwrap();
        assert_eq!(
            entries,
            vec![("parameters".to_string(), "Positive prompt: a cat".to_string())]
        );
    }

    #[test]
    fn test_walk_tolerates_truncation() {
        let mut bytes = stream(&[chunk(b"tEXt", b"a\0one"), chunk(b"tEXt", b"b\0two")]);
        bytes.truncate(bytes.len() - 6);

        let entries = read_text_chunks(bytes.as_slice()).unwrap();
        assert_eq!(entries, vec![("a".to_string(), "one".to_string())]);
        assert!(read_text_chunks(&b"not a png"[..]).unwrap().is_empty());
    }
}
