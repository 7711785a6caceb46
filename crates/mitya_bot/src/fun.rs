//! Novelty phrase commands: quote, choice, chance.
//!
//! These answer instantly from local data and never touch the model.

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::OnceLock;

static QUOTES: OnceLock<Vec<String>> = OnceLock::new();

fn quotes() -> &'static [String] {
    QUOTES
        .get_or_init(|| {
            serde_json::from_str(include_str!("../assets/quotes.json")).unwrap_or_else(|e| {
                tracing::error!("Bundled quotes are unreadable: {}", e);
                Vec::new()
            })
        })
        .as_slice()
}

/// Match a lowercased message against the phrase commands. `None` means
/// the message is not a phrase command and should go down the usual path.
pub fn handle_phrase(lower: &str, prefix: &str) -> Option<String> {
    if lower.contains(&format!("{prefix}, выдай цитату")) {
        return Some(random_quote());
    }

    let choose_key = format!("{prefix}, выбери");
    if lower.starts_with(&choose_key) {
        return Some(choose(&lower[choose_key.len()..], prefix));
    }

    if lower.contains(&format!("{prefix}, шанс")) || lower.contains(&format!("{prefix}, вероятность"))
    {
        let percent = rand::thread_rng().gen_range(0..=100);
        return Some(format!("🔮 Вероятность: {percent}%"));
    }

    None
}

fn random_quote() -> String {
    match quotes().choose(&mut rand::thread_rng()) {
        Some(quote) => format!("📜 {quote}"),
        None => "Цитаты временно закончились...".to_string(),
    }
}

fn choose(content: &str, prefix: &str) -> String {
    let options: Vec<&str> = content
        .split(" или ")
        .map(|opt| opt.trim().trim_end_matches(['?', '!', '.']))
        .filter(|opt| !opt.is_empty())
        .collect();

    if options.len() < 2 {
        return format!("Используй «или». Пример: {prefix}, выбери А или Б");
    }

    match options.choose(&mut rand::thread_rng()) {
        Some(pick) => format!("🎲 Мой выбор: {pick}"),
        None => format!("Используй «или». Пример: {prefix}, выбери А или Б"),
    }
}
