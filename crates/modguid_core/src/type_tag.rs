use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_api::CoreError;

/// The host enumeration a request extends.
///
/// `as_str` is the enumeration's name in the host and is baked into every
/// persisted storage key, so renaming a variant's string breaks existing saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    Ability,
    SpecialTriggeredAbility,
    SpecialStatIcon,
    Mask,
    AscensionChallenge,
    Tribe,
    Region,
    Consumable,
    Language,
}

impl TypeTag {
    /// Every tag, in the order the type resolver walks registries.
    pub const ALL: [TypeTag; 9] = [
        TypeTag::Ability,
        TypeTag::SpecialTriggeredAbility,
        TypeTag::SpecialStatIcon,
        TypeTag::Mask,
        TypeTag::AscensionChallenge,
        TypeTag::Tribe,
        TypeTag::Region,
        TypeTag::Consumable,
        TypeTag::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Ability => "Ability",
            Self::SpecialTriggeredAbility => "SpecialTriggeredAbility",
            Self::SpecialStatIcon => "SpecialStatIcon",
            Self::Mask => "Mask",
            Self::AscensionChallenge => "AscensionChallenge",
            Self::Tribe => "Tribe",
            Self::Region => "Region",
            Self::Consumable => "Consumable",
            Self::Language => "Language",
        }
    }

    /// Prefix shared by every storage key allocated for this tag.
    pub fn key_prefix(&self) -> String {
        format!("{}_", self.as_str())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let expected: Vec<&str> = TypeTag::ALL.iter().map(TypeTag::as_str).collect();
                CoreError::invalid_argument(format!(
                    "unknown type tag '{raw}'; expected one of: {}",
                    expected.join(", ")
                ))
            })
    }
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident => $tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            pub const TYPE_TAG: TypeTag = $tag;

            pub const fn from_raw(raw: i32) -> Self {
                Self(raw)
            }

            pub const fn raw(&self) -> i32 {
                self.0
            }

            /// True when the value was minted by the allocator rather than
            /// defined natively by the host.
            pub const fn is_custom(&self, base_offset: i32) -> bool {
                self.0 >= base_offset
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> i32 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", Self::TYPE_TAG, self.0)
            }
        }
    };
}

typed_id!(AbilityId => TypeTag::Ability);
typed_id!(SpecialTriggeredAbilityId => TypeTag::SpecialTriggeredAbility);
typed_id!(SpecialStatIconId => TypeTag::SpecialStatIcon);
typed_id!(MaskId => TypeTag::Mask);
typed_id!(ChallengeId => TypeTag::AscensionChallenge);
typed_id!(TribeId => TypeTag::Tribe);
typed_id!(RegionId => TypeTag::Region);
typed_id!(ConsumableId => TypeTag::Consumable);
typed_id!(LanguageId => TypeTag::Language);

pub fn int_to_ability(raw: i32) -> AbilityId {
    AbilityId::from_raw(raw)
}

pub fn ability_to_int(ability: AbilityId) -> i32 {
    ability.raw()
}
