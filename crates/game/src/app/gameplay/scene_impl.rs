use std::path::PathBuf;

use engine::{InputSnapshot, Scene, SceneCommand, SceneWorld, StatusBars};
use tracing::info;

use super::config::GameConfig;
use super::session::{PersistenceStatus, Session};
use super::world_loader::{parse_world, WorldLayout, WorldLoadError};

pub(crate) struct GameplayScene {
    config: GameConfig,
    layout: WorldLayout,
    save_path: Option<PathBuf>,
    session: Option<Session>,
}

impl GameplayScene {
    pub(crate) fn new(
        config: GameConfig,
        map_source: &str,
        save_path: Option<PathBuf>,
    ) -> Result<Self, WorldLoadError> {
        let layout = parse_world(map_source, &config)?;
        info!(
            width = layout.grid.width(),
            height = layout.grid.height(),
            spawns = layout.spawns.len(),
            walls = layout.grid.wall_rects().len(),
            barriers = layout.barriers.len(),
            "world_parsed"
        );
        Ok(Self {
            config,
            layout,
            save_path,
            session: None,
        })
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

impl Scene for GameplayScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.session = Some(Session::start(
            &self.config,
            &self.layout,
            world,
            self.save_path.clone(),
        ));
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            if let Some(session) = &self.session {
                info!(ticks = session.ticks(), score = session.stats().score(), "quit_requested");
            }
            return SceneCommand::Quit;
        }
        match self.session.as_mut() {
            Some(session) => session.tick(input, world),
            None => SceneCommand::None,
        }
    }

    fn render(&mut self, _world: &SceneWorld) {}

    fn unload(&mut self, _world: &mut SceneWorld) {
        if let Some(session) = self.session.take() {
            info!(
                ticks = session.ticks(),
                score = session.stats().score(),
                game_over = session.flags().game_over,
                "session_ended"
            );
        }
    }

    fn status_bars(&self, _world: &SceneWorld) -> Option<StatusBars> {
        self.session.as_ref().map(Session::status_bars)
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        let hud = self.session.as_ref()?.hud(world);
        let mut title = format!(
            "Knight | HP {}/{} | Mana {}/{} | Potions H{} M{} | ATK +{} | Score {}",
            hud.hp,
            hud.max_hp,
            hud.mana,
            hud.max_mana,
            hud.health_potions,
            hud.mana_potions,
            hud.attack_bonus,
            hud.score
        );
        if hud.flags.game_over {
            title.push_str(" | Game Over");
        } else if hud.flags.menu_open {
            title.push_str(" | Paused");
        }
        if hud.flags.music_paused {
            title.push_str(" | Music off");
        }
        if hud.flags.inventory_open {
            let used = hud.inventory_capacity - hud.free_slots;
            title.push_str(&format!(
                " | Bag {used}/{} [{}]",
                hud.inventory_capacity,
                hud.inventory.join(", ")
            ));
        }
        if hud.nearby_chest.is_some_and(|chest| !chest.is_open) {
            title.push_str(" | Press E to open treasure chest");
        }
        if let Some(riddle) = &hud.riddle {
            title.push_str(" | ");
            title.push_str(&riddle.question);
            title.push(' ');
            title.push_str(&riddle.options.join(" "));
        } else if hud.barrier_nearby {
            title.push_str(" | Press E to read the riddle");
        }
        match &hud.persistence {
            Some(PersistenceStatus::Saved) => title.push_str(" | Saved"),
            Some(PersistenceStatus::Loaded) => title.push_str(" | Loaded"),
            Some(PersistenceStatus::SaveFailed(reason)) => {
                title.push_str(&format!(" | Save failed: {reason}"));
            }
            Some(PersistenceStatus::LoadFailed(reason)) => {
                title.push_str(&format!(" | Load failed: {reason}"));
            }
            None => {}
        }
        Some(title)
    }
}
