macro_rules! const_color {
    ($name:ident, $value:expr) => {
        paste::paste! {
            pub const $name: u32 = $value;

            pub fn [<$name:lower>]() -> poise::serenity_prelude::Colour {
                poise::serenity_prelude::Colour::new($name)
            }
        }
    };
    ($name:ident, $r:expr, $g:expr, $b:expr) => {
        paste::paste! {
            pub const $name: u32 = ($r as u32) << 16 | ($g as u32) << 8 | ($b as u32);

            pub fn [<$name:lower>]() -> poise::serenity_prelude::Colour {
                poise::serenity_prelude::Colour::new($name)
            }
        }
    };
}

const_color! { RED,         0xE74C3C }
const_color! { DARK_RED,    0x992D22 }
const_color! { BLUE,        0x3498DB }
const_color! { GREEN,       0x2ECC71 }
const_color! { GOLD,        0xF1C40F }
const_color! { ORANGE,      0xE67E22 }
const_color! { DARK_ORANGE, 0xA84300 }
const_color! { PURPLE,      0x9B59B6 }
const_color! { TEAL,        0x1ABC9C }
const_color! { YELLOW,      0xFEE75C }
const_color! { SLATE,       0x3E6775 }

const_color! { DARK_GREY, 96, 125, 139 }
