use crate::session::{GameMode, GameResult};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

const TWEET_INTENT: &str = "https://twitter.com/intent/tweet?text=";

/// Plain-text result suitable for pasting anywhere
pub fn summary_text(result: &GameResult) -> String {
    format!(
        "Type Alpha - {}\nWPM: {}\nACC: {:.1}%",
        result.mode.label(),
        result.wpm.round(),
        result.accuracy
    )
}

/// Post body: header, mode, WPM and accuracy lines, hashtag
pub fn tweet_text(result: &GameResult) -> String {
    let mode = match result.mode {
        GameMode::Daily => "🎯 Daily Challenge",
        GameMode::Practice => "🔄 Practice",
    };
    format!(
        "【Type Alpha】\n{mode}\n⌨️ WPM: {}\n✅ ACC: {:.1}%\n#TypeAlpha",
        result.wpm.round(),
        result.accuracy
    )
}

/// Tweet-intent URL prefilled with [`tweet_text`]
pub fn tweet_url(result: &GameResult) -> String {
    format!(
        "{TWEET_INTENT}{}",
        utf8_percent_encode(&tweet_text(result), NON_ALPHANUMERIC)
    )
}
