use serde::{Deserialize, Serialize};

use super::{BehaviorDescriptor, RegistryRecord};
use crate::type_tag::{
    AbilityId, ChallengeId, ConsumableId, MaskId, RegionId, SpecialStatIconId,
    SpecialTriggeredAbilityId, TribeId, TypeTag,
};

// Every record carries `id`, `owner`, `name`, `display_name` and `behavior`;
// the rest is kind-specific metadata the host reads.
macro_rules! registry_record {
    ($record:ident, $tag:expr, $id_type:ident, $id_fn:ident) => {
        impl $record {
            pub fn new(
                owner: impl Into<String>,
                name: impl Into<String>,
                display_name: impl Into<String>,
            ) -> Self {
                Self {
                    owner: owner.into(),
                    name: name.into(),
                    display_name: display_name.into(),
                    ..Self::default()
                }
            }

            /// A record the host defines natively, below the base offset.
            pub fn builtin(id: i32, name: impl Into<String>) -> Self {
                let name = name.into();
                Self {
                    id,
                    display_name: name.clone(),
                    name,
                    ..Self::default()
                }
            }

            pub fn with_behavior(mut self, behavior: BehaviorDescriptor) -> Self {
                self.behavior = Some(behavior);
                self
            }

            pub fn $id_fn(&self) -> $id_type {
                $id_type::from_raw(self.id)
            }
        }

        impl RegistryRecord for $record {
            const TYPE_TAG: TypeTag = $tag;

            fn owner(&self) -> &str {
                &self.owner
            }

            fn logical_name(&self) -> &str {
                &self.name
            }

            fn display_name(&self) -> &str {
                if self.display_name.is_empty() {
                    &self.name
                } else {
                    &self.display_name
                }
            }

            fn identifier(&self) -> i32 {
                self.id
            }

            fn set_identifier(&mut self, id: i32) {
                self.id = id;
            }

            fn behavior(&self) -> Option<&BehaviorDescriptor> {
                self.behavior.as_ref()
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FullAbility {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub rulebook_description: String,
    pub power_level: i32,
    pub activated: bool,
    pub opponent_usable: bool,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(FullAbility, TypeTag::Ability, AbilityId, ability_id);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FullSpecialTriggeredAbility {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(
    FullSpecialTriggeredAbility,
    TypeTag::SpecialTriggeredAbility,
    SpecialTriggeredAbilityId,
    special_ability_id
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FullStatIcon {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub rulebook_description: String,
    pub applies_to_attack: bool,
    pub applies_to_health: bool,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(
    FullStatIcon,
    TypeTag::SpecialStatIcon,
    SpecialStatIconId,
    stat_icon_id
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomMask {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub model_type: String,
    pub texture_path: Option<String>,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(CustomMask, TypeTag::Mask, MaskId, mask_id);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FullChallenge {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Positive values make a run harder and score points.
    pub points: i32,
    pub unlock_level: i32,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(
    FullChallenge,
    TypeTag::AscensionChallenge,
    ChallengeId,
    challenge_id
);

/// A totem head, identified by the tribe it represents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomTotemTop {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub model_path: Option<String>,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(CustomTotemTop, TypeTag::Tribe, TribeId, tribe_id);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomRegion {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub tier: i32,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(CustomRegion, TypeTag::Region, RegionId, region_id);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumableItem {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub display_name: String,
    pub rulebook_description: String,
    pub power_level: i32,
    pub behavior: Option<BehaviorDescriptor>,
}

registry_record!(ConsumableItem, TypeTag::Consumable, ConsumableId, consumable_id);
