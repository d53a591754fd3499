//! Bot display names.

use ouroboros_types::PlayerId;

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of bot names, indexed by identifier. Identifiers past the
/// end of the pool wrap around and get a numeric suffix.
const NAME_POOL: &[&str] = &[
    "Adder", "Boa", "Cobra", "Dugite", "Eryx", "Fer-de-lance", "Garter", "Habu",
    "Indigo", "Jararaca", "Krait", "Lancehead", "Mamba", "Natrix", "Oenpelli", "Python",
    "Quetzal", "Racer", "Sidewinder", "Taipan", "Urutu", "Viper", "Whipsnake", "Xenodon",
    "Yarara", "Zamenis", "Asp", "Bushmaster", "Copperhead", "Diamondback", "Egg-eater", "Flying",
    "Gopher", "Hognose", "Inland", "Jumping", "Kingsnake", "Lyre", "Milksnake", "Nightsnake",
    "Olive", "Pine", "Queen", "Rattler", "Sand", "Tiger", "Uropeltis", "Vine",
    "Worm", "Xeno", "Yellowbelly", "Zebra",
];

/// Display name for the bot occupying `id`.
pub fn bot_name(id: PlayerId) -> String {
    let raw = usize::from(id.into_inner());
    let len = NAME_POOL.len();
    let base = NAME_POOL.get(raw.checked_rem(len).unwrap_or(0)).copied().unwrap_or("Snake");
    if raw < len {
        base.to_owned()
    } else {
        format!("{base} {raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_identifiers_use_the_plain_name() {
        assert_eq!(bot_name(PlayerId::new(0)), "Adder");
        assert_eq!(bot_name(PlayerId::new(2)), "Cobra");
    }

    #[test]
    fn wrapped_identifiers_are_suffixed() {
        let len = u16::try_from(NAME_POOL.len()).unwrap_or(u16::MAX);
        assert_eq!(bot_name(PlayerId::new(len)), format!("Adder {len}"));
    }
}
