//! Reply formatting.
//!
//! Replies are rendered as Discord-flavoured markdown: a bold title, the body,
//! an optional bulleted info block, and an italic footer.

pub const PROGRESS_HISTORY: &str = "🔄 Analyzing conversation... This may take a moment.";
pub const PROGRESS_CACHE: &str = "🔄 Summarizing cached conversation...";
pub const NO_MESSAGES: &str = "❌ No messages found to summarize.";
pub const FAILED_HISTORY: &str =
    "❌ Failed to generate summary. Please check if the inference service is running.";
pub const FAILED_CACHE: &str = "❌ Failed to generate summary from cache.";

pub fn no_cached_messages(prefix: &str) -> String {
    format!("❌ No cached messages found. Try using `{prefix}summarize` instead.")
}

pub fn invalid_count(prefix: &str) -> String {
    format!("❌ Usage: `{prefix}summarize [number_of_messages]`, e.g. `{prefix}summarize 30`")
}

/// A structured reply, rendered to text before sending.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub title: String,
    pub body: String,
    pub info_title: Option<String>,
    pub info: Vec<(String, String)>,
    pub footer: Option<String>,
}

impl Reply {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            info_title: None,
            info: Vec::new(),
            footer: None,
        }
    }

    pub fn info(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.info.push((label.into(), value.to_string()));
        self
    }

    pub fn info_title(mut self, title: impl Into<String>) -> Self {
        self.info_title = Some(title.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("**{}**\n{}", self.title, self.body);

        if !self.info.is_empty() {
            out.push_str("\n\n");
            if let Some(title) = &self.info_title {
                out.push_str(&format!("**{title}**\n"));
            }
            let lines: Vec<String> = self
                .info
                .iter()
                .map(|(label, value)| format!("• {label}: {value}"))
                .collect();
            out.push_str(&lines.join("\n"));
        }

        if let Some(footer) = &self.footer {
            out.push_str(&format!("\n\n_{footer}_"));
        }
        out
    }
}

/// Facts shown under a summary.
#[derive(Debug, Clone)]
pub struct SummaryInfo<'a> {
    pub message_count: usize,
    pub channel: &'a str,
    pub requested_by: &'a str,
    pub model: &'a str,
}

/// Summary of channel history.
pub fn history_summary(summary: &str, info: &SummaryInfo<'_>) -> Reply {
    Reply::new("📝 Conversation Summary", summary)
        .info_title("📊 Analysis Info")
        .info("Messages analyzed", info.message_count)
        .info("Channel", info.channel)
        .info("Requested by", info.requested_by)
        .info("Model", info.model)
        .footer(format!("Powered by {}", info.model))
}

/// Summary of the bot's cache.
pub fn cache_summary(summary: &str, info: &SummaryInfo<'_>) -> Reply {
    Reply::new("📝 Cached Conversation Summary", summary)
        .info_title("📊 Cache Info")
        .info("Messages analyzed", info.message_count)
        .info("Source", "Bot cache")
        .info("Requested by", info.requested_by)
        .info("Model", info.model)
        .footer(format!("Powered by {}", info.model))
}

pub fn help(prefix: &str, model: &str) -> Reply {
    let commands = format!(
        "**{prefix}summarize [number]** - Summarize recent messages in the channel\n\
         **{prefix}summarize_cache** - Summarize messages from the bot's cache (faster)\n\
         **{prefix}help** - Show this help message\n\n\
         **Examples:**\n\
         `{prefix}summarize 30` - Summarize the last 30 messages\n\
         `{prefix}summarize` - Summarize the last 20 messages (default)\n\
         `{prefix}sumcache` - Summarize cached messages"
    );
    Reply::new(
        "🤖 Conversation Summarizer Bot",
        format!(
            "Summarizes conversations with a local language model.\n\n📋 **Commands**\n{commands}"
        ),
    )
    .footer(format!("Powered by {model}"))
}
