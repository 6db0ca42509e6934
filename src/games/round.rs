/*!

The seam between game loops and Discord.

Game loops only talk to a [`RoundChannel`]; [`SerenityChannel`] is the implementation that posts to a Discord channel
and waits for replies with a message collector.

*/

use std::{future::Future, time::Duration};

use poise::serenity_prelude::{
    self as serenity, ChannelId, Colour, CreateAttachment, CreateEmbed, CreateEmbedFooter,
    CreateMessage, EditMessage, MessageCollector, MessageId, UserId,
};
use tracing::trace;

use crate::{Error, games::answers::AnswerMatcher, infrastructure::ids::mention_user};

#[derive(Debug, Clone, PartialEq)]
pub enum PromptImage {
    Url(String),
    Bytes { filename: String, data: Vec<u8> },
}

/// An embed shown to the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<PromptImage>,
    pub footer: Option<String>,
    pub colour: Colour,
}

impl Prompt {
    pub fn new(title: impl Into<String>, colour: Colour) -> Self {
        Self {
            title: title.into(),
            description: None,
            image: None,
            footer: None,
            colour,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn image(mut self, image: PromptImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new().title(&self.title).colour(self.colour);
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        match &self.image {
            Some(PromptImage::Url(url)) => embed.image(url),
            Some(PromptImage::Bytes { filename, .. }) => embed.image(format!("attachment://{}", filename)),
            None => embed,
        }
    }
}

/// Whoever answered a round first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answerer {
    pub user_id: UserId,
    pub name: String,
}

impl Answerer {
    pub fn mention(&self) -> String {
        mention_user(self.user_id)
    }
}

pub trait RoundChannel: Send {
    fn say(&mut self, text: String) -> impl Future<Output = Result<(), Error>> + Send;

    fn show(&mut self, prompt: Prompt) -> impl Future<Output = Result<(), Error>> + Send;

    /// Replaces the most recently shown prompt.
    fn reveal(&mut self, prompt: Prompt) -> impl Future<Output = Result<(), Error>> + Send;

    /// Waits for the first message satisfying `matcher`. `None` means nobody answered in time.
    fn await_answer(
        &mut self,
        matcher: AnswerMatcher,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Answerer>, Error>> + Send;

    fn pause(&mut self, duration: Duration) -> impl Future<Output = ()> + Send;
}

pub struct SerenityChannel {
    ctx: serenity::Context,
    channel_id: ChannelId,
    last_prompt: Option<MessageId>,
}

impl SerenityChannel {
    pub fn new(ctx: &serenity::Context, channel_id: ChannelId) -> Self {
        Self {
            ctx: ctx.clone(),
            channel_id,
            last_prompt: None,
        }
    }
}

impl RoundChannel for SerenityChannel {
    async fn say(&mut self, text: String) -> Result<(), Error> {
        self.channel_id.say(&self.ctx, text).await?;
        Ok(())
    }

    async fn show(&mut self, prompt: Prompt) -> Result<(), Error> {
        let mut message = CreateMessage::new().embed(prompt.to_embed());
        if let Some(PromptImage::Bytes { filename, data }) = prompt.image {
            message = message.add_file(CreateAttachment::bytes(data, filename));
        }
        let sent = self.channel_id.send_message(&self.ctx, message).await?;
        self.last_prompt = Some(sent.id);
        Ok(())
    }

    async fn reveal(&mut self, prompt: Prompt) -> Result<(), Error> {
        match self.last_prompt {
            Some(message_id) => {
                self.channel_id
                    .edit_message(&self.ctx, message_id, EditMessage::new().embed(prompt.to_embed()))
                    .await?;
                Ok(())
            }
            None => self.show(prompt).await,
        }
    }

    async fn await_answer(
        &mut self,
        matcher: AnswerMatcher,
        timeout: Duration,
    ) -> Result<Option<Answerer>, Error> {
        trace!(?matcher, ?timeout, "Waiting for an answer");
        let reply = MessageCollector::new(&self.ctx)
            .channel_id(self.channel_id)
            .timeout(timeout)
            .filter(move |message| !message.author.bot && matcher.matches(&message.content))
            .await;

        Ok(reply.map(|message| Answerer {
            user_id: message.author.id,
            name: message
                .author
                .global_name
                .clone()
                .unwrap_or(message.author.name.clone()),
        }))
    }

    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;

    use super::*;

    /// Records everything a game says and replays scripted answers.
    #[derive(Default)]
    pub struct ScriptedChannel {
        pub said: Vec<String>,
        pub shown: Vec<Prompt>,
        pub revealed: Vec<Prompt>,
        pub waits: Vec<(AnswerMatcher, Duration)>,
        pub paused: Duration,
        answers: VecDeque<Option<Answerer>>,
    }

    impl ScriptedChannel {
        pub fn with_answers(answers: impl IntoIterator<Item = Option<Answerer>>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    pub fn player(id: u64, name: &str) -> Answerer {
        Answerer {
            user_id: UserId::new(id),
            name: name.into(),
        }
    }

    impl RoundChannel for ScriptedChannel {
        async fn say(&mut self, text: String) -> Result<(), Error> {
            self.said.push(text);
            Ok(())
        }

        async fn show(&mut self, prompt: Prompt) -> Result<(), Error> {
            self.shown.push(prompt);
            Ok(())
        }

        async fn reveal(&mut self, prompt: Prompt) -> Result<(), Error> {
            self.revealed.push(prompt);
            Ok(())
        }

        async fn await_answer(
            &mut self,
            matcher: AnswerMatcher,
            timeout: Duration,
        ) -> Result<Option<Answerer>, Error> {
            self.waits.push((matcher, timeout));
            Ok(self.answers.pop_front().flatten())
        }

        async fn pause(&mut self, duration: Duration) {
            self.paused += duration;
        }
    }
}
