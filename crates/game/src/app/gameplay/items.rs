use engine::{DrawLayer, EntityKind, Facing, RenderableDesc, RenderableKind, SpawnDesc, Vec2};
use serde::{Deserialize, Serialize};

use super::config::GameConfig;
use super::player::PlayerStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ItemCategory {
    HealthPotion,
    ManaPotion,
    Weapon,
    Collectible,
}

impl ItemCategory {
    pub(crate) fn from_map_char(ch: char) -> Option<Self> {
        match ch {
            'H' => Some(Self::HealthPotion),
            'M' => Some(Self::ManaPotion),
            'W' => Some(Self::Weapon),
            'C' => Some(Self::Collectible),
            _ => None,
        }
    }

    pub(crate) fn placeholder_rgba(self) -> [u8; 4] {
        match self {
            Self::HealthPotion => [255, 0, 0, 255],
            Self::ManaPotion => [0, 0, 255, 255],
            Self::Weapon => [255, 0, 0, 255],
            Self::Collectible => [255, 215, 0, 255],
        }
    }

    fn icon_key(self) -> &'static str {
        match self {
            Self::HealthPotion => "items/hp_potion",
            Self::ManaPotion => "items/mana_potion",
            Self::Weapon => "items/iron_sword",
            Self::Collectible => "items/gold_coin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Item {
    pub(crate) name: String,
    pub(crate) category: ItemCategory,
    pub(crate) quantity: u32,
    pub(crate) value: u32,
}

impl Item {
    fn single(name: &str, category: ItemCategory, value: u32) -> Self {
        Self {
            name: name.to_string(),
            category,
            quantity: 1,
            value,
        }
    }

    pub(crate) fn health_potion(heal: u32) -> Self {
        Self::single("Health Potion", ItemCategory::HealthPotion, heal)
    }

    pub(crate) fn mana_potion(restore: u32) -> Self {
        Self::single("Mana Potion", ItemCategory::ManaPotion, restore)
    }

    pub(crate) fn weapon(name: &str, attack_bonus: u32) -> Self {
        Self::single(name, ItemCategory::Weapon, attack_bonus)
    }

    pub(crate) fn collectible(name: &str, points: u32) -> Self {
        Self::single(name, ItemCategory::Collectible, points)
    }

    pub(crate) fn from_category(category: ItemCategory, config: &GameConfig) -> Self {
        match category {
            ItemCategory::HealthPotion => Self::health_potion(config.health_potion_heal),
            ItemCategory::ManaPotion => Self::mana_potion(config.mana_potion_restore),
            ItemCategory::Weapon => Self::weapon("Iron Sword", config.weapon_attack_bonus),
            ItemCategory::Collectible => Self::collectible("Gold Coin", config.coin_points),
        }
    }

    pub(crate) fn display_name(&self) -> String {
        if self.quantity > 1 {
            format!("{} ({})", self.name, self.quantity)
        } else {
            self.name.clone()
        }
    }
}

pub(crate) fn item_pickup_spawn_desc(item: &Item, position: Vec2, tile_size: f32) -> SpawnDesc {
    SpawnDesc {
        kind: EntityKind::ItemPickup,
        layer: DrawLayer::Item,
        position,
        size: Vec2::new(tile_size, tile_size),
        facing: Facing::Down,
        renderable: RenderableDesc {
            kind: RenderableKind::Sprite(item.category.icon_key().to_string()),
            placeholder_rgba: item.category.placeholder_rgba(),
            debug_name: "item",
        },
    }
}

/// Ordered, capacity-bounded item list. `len() <= max_slots` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Inventory {
    max_slots: usize,
    items: Vec<Item>,
}

impl Inventory {
    pub(crate) fn new(max_slots: usize) -> Self {
        Self {
            max_slots,
            items: Vec::with_capacity(max_slots),
        }
    }

    pub(crate) fn add_item(&mut self, item: Item) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub(crate) fn remove_item(&mut self, index: usize) -> Option<Item> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub(crate) fn get_item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub(crate) fn has_category(&self, category: ItemCategory) -> bool {
        self.items.iter().any(|item| item.category == category)
    }

    pub(crate) fn items_by_category(&self, category: ItemCategory) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.category == category)
            .collect()
    }

    pub(crate) fn use_item(&mut self, index: usize, player: &mut PlayerStats) -> bool {
        let Some(item) = self.get_item(index) else {
            return false;
        };
        let applied = match item.category {
            ItemCategory::HealthPotion => player.use_hp_potion(item.value),
            ItemCategory::ManaPotion => player.use_mana_potion(item.value),
            ItemCategory::Weapon => player.equip_weapon(item.value),
            ItemCategory::Collectible => player.add_score(item.value),
        };
        if applied {
            self.consume_one(index);
        }
        applied
    }

    pub(crate) fn use_hp_potion(&mut self, player: &mut PlayerStats) -> bool {
        self.use_first_of(ItemCategory::HealthPotion, player)
    }

    pub(crate) fn use_mana_potion(&mut self, player: &mut PlayerStats) -> bool {
        self.use_first_of(ItemCategory::ManaPotion, player)
    }

    pub(crate) fn potion_count(&self, category: ItemCategory) -> u32 {
        self.items_by_category(category)
            .into_iter()
            .map(|item| item.quantity)
            .sum()
    }

    pub(crate) fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn max_slots(&self) -> usize {
        self.max_slots
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.max_slots
    }

    pub(crate) fn empty_slots(&self) -> usize {
        self.max_slots.saturating_sub(self.items.len())
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn replace_items(&mut self, items: Vec<Item>) {
        debug_assert!(items.len() <= self.max_slots);
        self.clear();
        self.items.extend(items.into_iter().take(self.max_slots));
    }

    fn use_first_of(&mut self, category: ItemCategory, player: &mut PlayerStats) -> bool {
        match self.items.iter().position(|item| item.category == category) {
            Some(index) => self.use_item(index, player),
            None => false,
        }
    }

    fn consume_one(&mut self, index: usize) {
        match self.items.get(index).map(|item| item.quantity) {
            Some(quantity) if quantity > 1 => self.items[index].quantity -= 1,
            Some(_) => {
                self.remove_item(index);
            }
            None => {}
        }
    }
}
