// Emoji and sticker copying.
//
// The Discord layer hands us whatever the user pasted (custom emoji markup,
// an ID, or a CDN link). We figure out which asset it is, download it through
// the `AssetFetcher` port and hand back something ready to upload.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

pub const EMOJI_MAX_BYTES: usize = 256 * 1024;
pub const STICKER_MAX_BYTES: usize = 512 * 1024;
const EMOJI_CDN: &str = "https://cdn.discordapp.com/emojis";
const STICKER_CDN: &str = "https://media.discordapp.net/stickers";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("`{0}` is not a custom emoji")]
    InvalidEmoji(String),

    #[error("Invalid name `{0}`: use 2-32 letters, numbers or underscores")]
    InvalidName(String),

    #[error("Could not download the image: {0}")]
    Fetch(String),

    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported image format")]
    UnsupportedImage,

    #[error("Lottie stickers can't be copied")]
    LottieSticker,
}

// ============================================================================
// MODELS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiRef {
    pub name: Option<String>,
    pub id: u64,
    pub animated: bool,
}

impl EmojiRef {
    pub fn cdn_url(&self) -> String {
        let ext = if self.animated { "gif" } else { "png" };
        format!("{}/{}.{}", EMOJI_CDN, self.id, ext)
    }

    /// Markup that renders the emoji inline, if we know its name.
    pub fn markup(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        let prefix = if self.animated { "a" } else { "" };
        Some(format!("<{}:{}:{}>", prefix, name, self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerFormat {
    Png,
    Apng,
    Gif,
    Lottie,
}

#[derive(Debug, Clone)]
pub struct StickerSource {
    pub id: u64,
    pub name: String,
    pub format: StickerFormat,
    pub tags: Option<String>,
    pub description: Option<String>,
}

pub fn sticker_cdn_url(id: u64, format: StickerFormat) -> Result<String, ExpressionError> {
    match format {
        StickerFormat::Png | StickerFormat::Apng => Ok(format!("{}/{}.png", STICKER_CDN, id)),
        StickerFormat::Gif => Ok(format!("{}/{}.gif", STICKER_CDN, id)),
        StickerFormat::Lottie => Err(ExpressionError::LottieSticker),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Gif,
    Jpeg,
    Webp,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(b"GIF8") {
            Some(ImageKind::Gif)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
        }
    }
}

/// An emoji that has been downloaded and encoded, ready for `create_emoji`.
#[derive(Debug, Clone)]
pub struct PreparedEmoji {
    pub name: String,
    pub animated: bool,
    pub data_uri: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct PreparedSticker {
    pub name: String,
    pub tags: String,
    pub description: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

// ============================================================================
// PARSING & NAMES
// ============================================================================

/// Accepts `<:name:id>`, `<a:name:id>`, a bare ID or an emoji CDN URL.
/// Discord snowflakes are never zero.
fn parse_snowflake(text: &str) -> Option<u64> {
    text.parse().ok().filter(|id| *id != 0)
}

pub fn parse_emoji(input: &str) -> Result<EmojiRef, ExpressionError> {
    let input = input.trim();
    let invalid = || ExpressionError::InvalidEmoji(input.to_string());

    if let Some(inner) = input.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        let parts: Vec<&str> = inner.split(':').collect();
        let [flag, name, id] = parts.as_slice() else {
            return Err(invalid());
        };
        let animated = match *flag {
            "" => false,
            "a" => true,
            _ => return Err(invalid()),
        };
        if name.is_empty() {
            return Err(invalid());
        }
        let id = parse_snowflake(id).ok_or_else(invalid)?;
        return Ok(EmojiRef {
            name: Some(name.to_string()),
            id,
            animated,
        });
    }

    if let Some(pos) = input.find("/emojis/") {
        let tail = &input[pos + "/emojis/".len()..];
        let id_end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
        let id = parse_snowflake(&tail[..id_end]).ok_or_else(invalid)?;
        let animated = tail[id_end..].starts_with(".gif");
        return Ok(EmojiRef {
            name: None,
            id,
            animated,
        });
    }

    let id = parse_snowflake(input).ok_or_else(invalid)?;
    Ok(EmojiRef {
        name: None,
        id,
        animated: false,
    })
}

/// Every distinct custom emoji found in a blob of text, in order of appearance.
pub fn parse_all(text: &str) -> Vec<EmojiRef> {
    let mut found: Vec<EmojiRef> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        let candidate = &rest[start..];
        let Some(end) = candidate.find('>') else {
            break;
        };

        match parse_emoji(&candidate[..=end]) {
            Ok(emoji) => {
                if !found.iter().any(|e| e.id == emoji.id) {
                    found.push(emoji);
                }
                rest = &candidate[end + 1..];
            }
            // Skip just the `<` so nested markup like `<<:a:1>` still matches.
            Err(_) => rest = &candidate[1..],
        }
    }

    found
}

pub fn validate_name(name: &str) -> Result<(), ExpressionError> {
    let valid_len = (2..=32).contains(&name.chars().count());
    let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(ExpressionError::InvalidName(name.to_string()))
    }
}

/// Turn an arbitrary label into a usable emoji name.
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(32)
        .collect();

    if name.is_empty() {
        name.push_str("emoji");
    }
    while name.len() < 2 {
        name.push('_');
    }
    name
}

pub fn to_data_uri(bytes: &[u8], kind: ImageKind) -> String {
    format!("data:{};base64,{}", kind.mime(), BASE64.encode(bytes))
}

// ============================================================================
// PORT & SERVICE
// ============================================================================

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExpressionError>;
}

pub struct ExpressionService<F: AssetFetcher> {
    fetcher: F,
}

impl<F: AssetFetcher> ExpressionService<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub async fn prepare_emoji(
        &self,
        emoji: &EmojiRef,
        name_override: Option<&str>,
    ) -> Result<PreparedEmoji, ExpressionError> {
        let name = match name_override {
            Some(name) => {
                validate_name(name)?;
                name.to_string()
            }
            None => match &emoji.name {
                Some(original) => sanitize_name(original),
                None => format!("emoji_{}", emoji.id),
            },
        };

        let bytes = self.fetcher.fetch(&emoji.cdn_url()).await?;
        if bytes.len() > EMOJI_MAX_BYTES {
            return Err(ExpressionError::TooLarge {
                size: bytes.len(),
                limit: EMOJI_MAX_BYTES,
            });
        }

        let kind = ImageKind::sniff(&bytes).ok_or(ExpressionError::UnsupportedImage)?;
        tracing::debug!(emoji_id = emoji.id, size = bytes.len(), "Fetched emoji image");

        Ok(PreparedEmoji {
            name,
            animated: kind == ImageKind::Gif,
            data_uri: to_data_uri(&bytes, kind),
            size: bytes.len(),
        })
    }

    pub async fn prepare_sticker(
        &self,
        source: &StickerSource,
        name_override: Option<&str>,
    ) -> Result<PreparedSticker, ExpressionError> {
        let url = sticker_cdn_url(source.id, source.format)?;

        let name = name_override.unwrap_or(&source.name).trim().to_string();
        if !(2..=30).contains(&name.chars().count()) {
            return Err(ExpressionError::InvalidName(name));
        }

        let bytes = self.fetcher.fetch(&url).await?;
        if bytes.len() > STICKER_MAX_BYTES {
            return Err(ExpressionError::TooLarge {
                size: bytes.len(),
                limit: STICKER_MAX_BYTES,
            });
        }

        let kind = ImageKind::sniff(&bytes).ok_or(ExpressionError::UnsupportedImage)?;

        let tags = source
            .tags
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| sanitize_name(&name));

        Ok(PreparedSticker {
            filename: format!("{}.{}", sanitize_name(&name), kind.extension()),
            name,
            tags,
            description: source.description.clone().unwrap_or_default(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    struct FakeFetcher {
        body: Vec<u8>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn returning(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExpressionError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    #[test]
    fn parses_static_and_animated_markup() {
        let emoji = parse_emoji("<:blobwave:123456>").unwrap();
        assert_eq!(emoji.name.as_deref(), Some("blobwave"));
        assert_eq!(emoji.id, 123456);
        assert!(!emoji.animated);
        assert_eq!(emoji.cdn_url(), "https://cdn.discordapp.com/emojis/123456.png");

        let emoji = parse_emoji(" <a:party:42> ").unwrap();
        assert!(emoji.animated);
        assert_eq!(emoji.markup().as_deref(), Some("<a:party:42>"));
    }

    #[test]
    fn parses_ids_and_cdn_links() {
        let emoji = parse_emoji("987").unwrap();
        assert_eq!(emoji.id, 987);
        assert_eq!(emoji.name, None);

        let emoji = parse_emoji("https://cdn.discordapp.com/emojis/555.gif?size=96").unwrap();
        assert_eq!(emoji.id, 555);
        assert!(emoji.animated);
    }

    #[test]
    fn rejects_unicode_and_garbage() {
        assert!(parse_emoji("😀").is_err());
        assert!(parse_emoji("<b:name:1>").is_err());
        assert!(parse_emoji("<:name:notanid>").is_err());
        assert!(parse_emoji("<::1>").is_err());
    }

    #[test]
    fn zero_ids_are_rejected() {
        for input in ["0", "<:x:0>", "<a:x:000>", "https://cdn.discordapp.com/emojis/0.png"] {
            assert!(
                matches!(parse_emoji(input), Err(ExpressionError::InvalidEmoji(_))),
                "{} should not parse",
                input
            );
        }
        assert!(parse_all("<:x:0> <:y:7>").iter().all(|e| e.id == 7));
    }

    #[test]
    fn parse_all_dedupes_and_skips_noise() {
        let found = parse_all("hi <:a:1> <3 <a:b:2> again <:a:1> <<:c:3>");
        let ids: Vec<u64> = found.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("ok_name").is_ok());
        assert!(validate_name("x").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name(&"a".repeat(33)).is_err());

        assert_eq!(sanitize_name("party parrot!"), "party_parrot");
        assert_eq!(sanitize_name("é"), "emoji");
        assert_eq!(sanitize_name("a"), "a_");
        assert_eq!(sanitize_name(&"z".repeat(40)).len(), 32);
    }

    #[test]
    fn sniffs_magic_bytes() {
        assert_eq!(ImageKind::sniff(PNG_BYTES), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a..."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"<html>"), None);
    }

    #[tokio::test]
    async fn prepares_emoji_as_data_uri() {
        let service = ExpressionService::new(FakeFetcher::returning(PNG_BYTES));
        let emoji = parse_emoji("<:blob:10>").unwrap();

        let prepared = service.prepare_emoji(&emoji, None).await.unwrap();
        assert_eq!(prepared.name, "blob");
        assert!(!prepared.animated);
        assert!(prepared.data_uri.starts_with("data:image/png;base64,"));
        assert_eq!(
            service.fetcher.requested.lock().unwrap().as_slice(),
            ["https://cdn.discordapp.com/emojis/10.png"]
        );

        let renamed = service.prepare_emoji(&emoji, Some("new_name")).await.unwrap();
        assert_eq!(renamed.name, "new_name");

        let err = service.prepare_emoji(&emoji, Some("bad name")).await.unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidName(_)));
    }

    #[tokio::test]
    async fn rejects_oversized_and_unknown_images() {
        let mut big = PNG_BYTES.to_vec();
        big.resize(EMOJI_MAX_BYTES + 1, 0);
        let service = ExpressionService::new(FakeFetcher::returning(&big));
        let emoji = parse_emoji("11").unwrap();
        assert!(matches!(
            service.prepare_emoji(&emoji, None).await,
            Err(ExpressionError::TooLarge { .. })
        ));

        let service = ExpressionService::new(FakeFetcher::returning(b"not an image"));
        assert_eq!(
            service.prepare_emoji(&emoji, None).await.unwrap_err(),
            ExpressionError::UnsupportedImage
        );
    }

    #[tokio::test]
    async fn stickers_default_tags_and_refuse_lottie() {
        let service = ExpressionService::new(FakeFetcher::returning(PNG_BYTES));
        let source = StickerSource {
            id: 77,
            name: "Happy Cat".to_string(),
            format: StickerFormat::Png,
            tags: None,
            description: None,
        };

        let prepared = service.prepare_sticker(&source, None).await.unwrap();
        assert_eq!(prepared.name, "Happy Cat");
        assert_eq!(prepared.tags, "Happy_Cat");
        assert_eq!(prepared.filename, "Happy_Cat.png");

        let lottie = StickerSource {
            format: StickerFormat::Lottie,
            ..source
        };
        assert_eq!(
            service.prepare_sticker(&lottie, None).await.unwrap_err(),
            ExpressionError::LottieSticker
        );
    }
}
