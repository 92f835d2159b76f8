//! Leading-emoji detection and memo spacing normalization.

use std::sync::LazyLock;

use crate::error::PipelineError;
use crate::pipeline::types::ClassifiedRecord;

/// One user-perceived emoji: a flag pair, a keycap, or a pictograph with
/// its presentation selectors, skin-tone modifiers, tag sequence and ZWJ
/// continuations.
///
/// Bare `0-9`, `#` and `*` carry the Unicode `Emoji` property but are only
/// treated as emoji when followed by the keycap mark.
const EMOJI: &str = r"(?:[\x{1F1E6}-\x{1F1FF}]{2}|[0-9#*]\x{FE0F}?\x{20E3}|[\p{Emoji}--[0-9#*]](?:[\x{FE0F}\x{20E3}\p{Emoji_Modifier}\x{E0020}-\x{E007F}]|\x{200D}\p{Emoji})*)";

static LEADING_EMOJI: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(&format!("^{EMOJI}")).expect("leading emoji pattern is valid")
});

static EMOJI_MEMO: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(&format!(r"(?s)^({EMOJI})\s*(.*)$")).expect("emoji memo pattern is valid")
});

/// Whether `memo` begins with an emoji.
pub fn starts_with_emoji(memo: &str) -> bool {
    LEADING_EMOJI.is_match(memo)
}

/// Rewrite `memo` as `<emoji> <rest>` with exactly one separating space.
pub fn normalize_memo(memo: &str) -> Result<String, PipelineError> {
    let caps = EMOJI_MEMO
        .captures(memo)
        .ok_or_else(|| PipelineError::EmojiMismatch {
            memo: memo.to_string(),
        })?;
    Ok(format!("{} {}", &caps[1], &caps[2]))
}

/// Normalize the memo of every record, failing on the first mismatch.
pub fn normalize_records(
    records: Vec<ClassifiedRecord>,
) -> Result<Vec<ClassifiedRecord>, PipelineError> {
    records
        .into_iter()
        .map(|record| {
            Ok(ClassifiedRecord {
                memo: normalize_memo(&record.memo)?,
                ..record
            })
        })
        .collect()
}
