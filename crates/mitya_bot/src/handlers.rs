//! Update routing: commands, the settings keyboard, text and voice flows.

use crate::fun;
use crate::App;
use mitya_core::{ChatSettings, ReputationLedger, SettingsStore};
use mitya_reasoning::ReplyRequest;
use mitya_voice::AudioFormat;
use rand::Rng;
use std::sync::Arc;
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, ReplyParameters};
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Что умеет Митя:")]
pub enum Command {
    #[command(description = "перезапустить")]
    Start,
    #[command(description = "привет, узнать id чата")]
    Hi,
    #[command(description = "меню")]
    Menu,
    #[command(description = "настройки")]
    Settings,
    #[command(description = "репутация")]
    Karma,
}

pub async fn set_commands(bot: &Bot) -> anyhow::Result<()> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Build the dispatcher and run long polling until shutdown.
pub async fn run(bot: Bot, app: Arc<App>) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(Update::filter_callback_query().endpoint(on_callback))
        .branch(Update::filter_message().endpoint(on_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

// ============================================================================
// Commands
// ============================================================================

async fn on_command(bot: Bot, msg: Message, cmd: Command, app: Arc<App>) -> ResponseResult<()> {
    if let Err(e) = handle_command(&bot, &msg, cmd, &app).await {
        tracing::error!("Command handling failed: {:#}", e);
    }
    Ok(())
}

async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, app: &App) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    match cmd {
        Command::Start => {
            let name = msg
                .from
                .as_ref()
                .map(|u| u.first_name.clone())
                .unwrap_or_else(|| "друг".to_string());
            bot.send_message(
                chat_id,
                format!(
                    "Здарова, {name}! 👋\n\
                     Я Митя. У меня есть память, характер и уши.\n\
                     Жми /menu, чтобы узнать, что я умею."
                ),
            )
            .await?;
        }
        Command::Hi => {
            let text = if msg.chat.is_private() {
                format!("Привет! Мы в личке. Id чата: {}", chat_id.0)
            } else {
                format!(
                    "Привет! Я работаю в группе «{}», id чата {}",
                    msg.chat.title().unwrap_or("без названия"),
                    chat_id.0
                )
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Menu => {
            bot.send_message(chat_id, menu_text(&app.cfg.trigger_word, &app.cfg.buddy_prefix))
                .await?;
        }
        Command::Karma => {
            let Some(user) = msg.from.as_ref() else {
                return Ok(());
            };
            let rep = app.store.reputation(chat_id.0, user.id.0 as i64).await;
            bot.send_message(chat_id, format!("📈 Твоя репутация: {rep}"))
                .reply_parameters(ReplyParameters::new(msg.id))
                .await?;
        }
        Command::Settings => {
            let settings = settings_or_default(app, chat_id.0).await;
            bot.send_message(
                chat_id,
                format!(
                    "🔧 Настройки\n🎲 Шанс вклиниться самому: {}%",
                    settings.reply_chance
                ),
            )
            .reply_markup(settings_keyboard(&settings))
            .await?;
        }
    }
    Ok(())
}

fn menu_text(trigger: &str, prefix: &str) -> String {
    format!(
        "📋 Меню Мити\n\n\
         🤖 Общение\n\
         — Напиши «{trigger}, ...» — я отвечу\n\
         — В личке отвечаю всегда\n\
         — В группе могу вклиниться сам (настраивается)\n\n\
         🎤 Голос\n\
         — Отправь голосовое, я расшифрую\n\
         — Если скажешь «{trigger}» — отвечу\n\n\
         🎲 Команды в чате\n\
         — «{prefix}, выдай цитату»\n\
         — «{prefix}, выбери А или Б»\n\
         — «{prefix}, шанс ...»\n\n\
         📈 Репутация\n\
         — /karma — посмотреть свою карму\n\
         — За токсик карма падает, за позитив растёт\n\n\
         ⚙️ Управление\n\
         — /settings — вкл/выкл ИИ и голос, шанс вклиниться\n\n\
         😎 Совет\n\
         Чем ты вежливее — тем я добрее."
    )
}

fn settings_keyboard(settings: &ChatSettings) -> InlineKeyboardMarkup {
    let ai_label = format!("🧠 ИИ: {}", if settings.ai_enabled { "✅" } else { "❌" });
    let voice_label = format!("🎤 Войс: {}", if settings.voice_enabled { "✅" } else { "❌" });
    let ai_next = if settings.ai_enabled { "0" } else { "1" };
    let voice_next = if settings.voice_enabled { "0" } else { "1" };

    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            ai_label,
            format!("set_ai_{ai_next}"),
        )],
        vec![InlineKeyboardButton::callback(
            voice_label,
            format!("set_voice_{voice_next}"),
        )],
        vec![
            InlineKeyboardButton::callback("🔕 Молчать (0%)", "chance_0"),
            InlineKeyboardButton::callback("🎲 10%", "chance_10"),
        ],
        vec![
            InlineKeyboardButton::callback("🎲 30%", "chance_30"),
            InlineKeyboardButton::callback("🎲 50%", "chance_50"),
        ],
        vec![InlineKeyboardButton::callback(
            "📢 Всегда (100%)",
            "chance_100",
        )],
    ])
}

// ============================================================================
// Settings callbacks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsAction {
    Ai(bool),
    Voice(bool),
    Chance(u8),
}

fn parse_action(data: &str) -> Option<SettingsAction> {
    if let Some(rest) = data.strip_prefix("set_ai_") {
        return Some(SettingsAction::Ai(rest == "1"));
    }
    if let Some(rest) = data.strip_prefix("set_voice_") {
        return Some(SettingsAction::Voice(rest == "1"));
    }
    if let Some(rest) = data.strip_prefix("chance_") {
        return rest
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 100)
            .map(SettingsAction::Chance);
    }
    None
}

async fn on_callback(bot: Bot, query: CallbackQuery, app: Arc<App>) -> ResponseResult<()> {
    if let Err(e) = handle_callback(&bot, &query, &app).await {
        tracing::error!("Callback handling failed: {:#}", e);
    }
    Ok(())
}

async fn handle_callback(bot: &Bot, query: &CallbackQuery, app: &App) -> anyhow::Result<()> {
    let action = query.data.as_deref().and_then(parse_action);
    let target = query.message.as_ref().map(|m| (m.chat().id, m.id()));
    let (Some(action), Some((chat_id, message_id))) = (action, target) else {
        bot.answer_callback_query(&query.id).await?;
        return Ok(());
    };

    let (ack, summary) = match action {
        SettingsAction::Ai(on) => {
            app.store.set_ai_enabled(chat_id.0, on).await?;
            let status = if on { "✅ ВКЛ" } else { "❌ ВЫКЛ" };
            (
                format!("Мозг (ИИ): {status}"),
                format!("⚙️ Настройка изменена: мозг (ИИ) теперь {status}"),
            )
        }
        SettingsAction::Voice(on) => {
            app.store.set_voice_enabled(chat_id.0, on).await?;
            let status = if on { "✅ ВКЛ" } else { "❌ ВЫКЛ" };
            (
                format!("Слух (войс): {status}"),
                format!("⚙️ Настройка изменена: слух (войс) теперь {status}"),
            )
        }
        SettingsAction::Chance(percent) => {
            app.store.set_reply_chance(chat_id.0, percent).await?;
            let summary = match percent {
                0 => "🤐 Митя больше не вклинивается в разговор сам (шанс 0%)".to_string(),
                100 => "📢 Митя теперь комментирует каждое сообщение (шанс 100%)".to_string(),
                p => format!("🎲 Митя будет встревать в диалог с вероятностью {p}%"),
            };
            (format!("Шанс: {percent}%"), summary)
        }
    };

    bot.answer_callback_query(&query.id).text(ack).await?;
    // The old menu shows stale state; replace it with a confirmation
    if let Err(e) = bot.delete_message(chat_id, message_id).await {
        tracing::debug!("Could not delete settings menu: {}", e);
    }
    bot.send_message(chat_id, summary).await?;
    Ok(())
}

// ============================================================================
// Messages: text and voice
// ============================================================================

async fn on_message(bot: Bot, msg: Message, app: Arc<App>) -> ResponseResult<()> {
    let result = if msg.voice().is_some() {
        handle_voice(&bot, &msg, &app).await
    } else if let Some(text) = msg.text() {
        handle_text(&bot, &msg, text, &app).await
    } else {
        Ok(())
    };

    if let Err(e) = result {
        tracing::error!("Message handling failed: {:#}", e);
    }
    Ok(())
}

async fn handle_text(bot: &Bot, msg: &Message, text: &str, app: &App) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let lower = text.to_lowercase();
    let trigger = app.cfg.trigger_word.as_str();
    let sender = msg.from.as_ref();

    // Other bots only get a reaction when they address Mitya directly
    if sender.map(|u| u.is_bot).unwrap_or(false) && !lower.contains(trigger) {
        return Ok(());
    }

    if let Some(reply) = fun::handle_phrase(&lower, &app.cfg.buddy_prefix) {
        bot.send_message(chat_id, reply).await?;
        return Ok(());
    }

    let user_id = sender.map(|u| u.id.0 as i64);
    let name = sender
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "Аноним".to_string());

    // Messages that address Mitya feed the reputation score
    if lower.contains(trigger) {
        if let Some(uid) = user_id {
            let delta = app.classifier.score(text).await;
            if delta != 0 {
                app.store.adjust(chat_id.0, uid, &name, delta).await;
            }
        }
    }

    let settings = settings_or_default(app, chat_id.0).await;
    let reply_context = msg
        .reply_to_message()
        .and_then(|m| m.text())
        .map(|s| s.to_string());

    if msg.chat.is_private() {
        if settings.ai_enabled {
            let reply = app
                .engine
                .reply(ReplyRequest {
                    chat_id: chat_id.0,
                    text: text.to_string(),
                    user_id,
                    display_name: None,
                    reply_context,
                    unsolicited: false,
                })
                .await;
            bot.send_message(chat_id, reply).await?;
        }
        return Ok(());
    }

    // Group: explicit address by name
    if lower.starts_with(trigger) {
        if !settings.ai_enabled {
            return Ok(());
        }
        let prompt = text
            .get(trigger.len()..)
            .unwrap_or("")
            .trim_start_matches([',', '!', ':'])
            .trim()
            .to_string();
        bot.send_chat_action(chat_id, ChatAction::Typing).await?;
        let reply = app
            .engine
            .reply(ReplyRequest {
                chat_id: chat_id.0,
                text: prompt,
                user_id,
                display_name: Some(name),
                reply_context,
                unsolicited: false,
            })
            .await;
        bot.send_message(chat_id, reply).await?;
        return Ok(());
    }

    // Group: probabilistic interjection
    if settings.ai_enabled && settings.reply_chance > 0 {
        let roll: u8 = rand::thread_rng().gen_range(1..=100);
        if roll <= settings.reply_chance {
            bot.send_chat_action(chat_id, ChatAction::Typing).await?;
            let reply = app
                .engine
                .reply(ReplyRequest {
                    chat_id: chat_id.0,
                    text: text.to_string(),
                    user_id,
                    display_name: Some(name),
                    reply_context,
                    unsolicited: true,
                })
                .await;
            bot.send_message(chat_id, reply).await?;
        }
    }

    Ok(())
}

async fn handle_voice(bot: &Bot, msg: &Message, app: &App) -> anyhow::Result<()> {
    let Some(voice) = msg.voice() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    let settings = settings_or_default(app, chat_id.0).await;
    if !settings.voice_enabled {
        return Ok(());
    }

    let Some(stt) = app.stt.as_ref() else {
        bot.send_message(chat_id, "Голосовые пока не понимаю: расшифровка не подключена.")
            .await?;
        return Ok(());
    };

    bot.send_chat_action(chat_id, ChatAction::Typing).await?;
    let file = bot.get_file(&voice.file.id).await?;
    let mut audio = Vec::new();
    bot.download_file(&file.path, &mut audio).await?;

    let transcript = match stt.transcribe(audio, AudioFormat::OggOpus).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Transcription failed: {:#}", e);
            bot.send_message(chat_id, "Не расслышал, попробуй ещё раз.")
                .reply_parameters(ReplyParameters::new(msg.id))
                .await?;
            return Ok(());
        }
    };
    if transcript.text.is_empty() {
        bot.send_message(chat_id, "Не расслышал...")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    let sender = msg.from.as_ref();
    let user_id = sender.map(|u| u.id.0 as i64);
    let name = sender
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "Аноним".to_string());

    if let Some(uid) = user_id {
        let delta = app.classifier.score(&transcript.text).await;
        if delta != 0 {
            app.store.adjust(chat_id.0, uid, &name, delta).await;
        }
    }

    let lower = transcript.text.to_lowercase();
    let trigger = app.cfg.trigger_word.as_str();
    if lower.contains(trigger) {
        let prompt = lower.replace(trigger, " ").trim().to_string();
        let reply = app
            .engine
            .reply(ReplyRequest {
                chat_id: chat_id.0,
                text: prompt,
                user_id,
                display_name: None,
                reply_context: None,
                unsolicited: false,
            })
            .await;
        bot.send_message(
            chat_id,
            format!("🎤 Расшифровка: {}\n\n😎 Митя: {}", transcript.text, reply),
        )
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    } else {
        bot.send_message(chat_id, format!("🎤 Расшифровка: {}", transcript.text))
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
    }

    Ok(())
}

async fn settings_or_default(app: &App, chat_id: i64) -> ChatSettings {
    match app.store.chat_settings(chat_id).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Settings read failed for chat {}: {}", chat_id, e);
            ChatSettings::default()
        }
    }
}
