use crate::infrastructure::botdata;

pub mod entities;

pub mod games {
    pub mod answers;
    pub mod elimination;
    pub mod f1;
    pub mod leaderboard;
    pub mod minigames;
    pub mod nba;
    pub mod round;
    pub mod trivia;
}

pub mod auction {
    pub mod embed;
    pub mod house;
    pub mod ladder;
    pub mod repository;
    pub mod timer;
}

pub mod fantasy {
    pub mod draft;
    pub mod league;
    pub mod repository;
    pub mod scoring;
    pub mod slots;
    pub mod stats;
    pub mod trade;
}

pub mod commands {
    pub mod auction;
    pub mod battle_royale;
    pub mod builtins;
    pub mod fantasy;
    pub mod minigame;
    pub mod trivia;
}

pub mod infrastructure {
    pub mod botdata;
    pub mod colors;
    pub mod environment;
    pub mod event_handler;
    pub mod guild_store;
    pub mod http;
    pub mod ids;
    pub mod sessions;
    pub mod util;
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, botdata::Data, Error>;
