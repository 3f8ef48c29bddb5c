//! Dashboard selection state and key bindings
//!
//! Keys become reconciler messages. The app never mutates the model: it
//! reads the latest published store to pick what to act on, and sends
//! relative edits as steps the reconciler resolves against its own model,
//! since the published store may lag behind queued keys.

use crossterm::event::KeyCode;
use hue_state::{
    Direction, Light, LightChange, LightId, LightStore, LocalIntent, Message, Room, RoomId, Scene,
};

/// Brightness step for left/right, in percent
pub const BRIGHTNESS_STEP: u8 = 10;
/// Dimming a room never takes its lights below this
pub const ROOM_MIN_BRIGHTNESS: u8 = 10;
/// Temperature step for warmer/cooler, in mirek
pub const MIREK_STEP: i16 = 25;
/// 20 degrees of the hue circle in bridge units
pub const HUE_STEP: i32 = 3640;
pub const SATURATION_STEP: i16 = 25;

/// One line of the light list
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Room(usize),
    Light { room: usize, light: LightId },
}

/// Every row in display order: each room followed by its lights
pub fn rows(store: &LightStore) -> Vec<Row> {
    let mut rows = Vec::new();
    for (index, room) in store.rooms().iter().enumerate() {
        rows.push(Row::Room(index));
        rows.extend(room.lights.iter().map(|id| Row::Light {
            room: index,
            light: id.clone(),
        }));
    }
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Lights,
    Scenes {
        room_id: Option<RoomId>,
        selected: usize,
    },
}

#[derive(Debug)]
pub struct App {
    selected: usize,
    view: View,
    should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            selected: 0,
            view: View::Lights,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Index of the selected row, clamped to the current list
    pub fn selected_index(&self, store: &LightStore) -> usize {
        let len = rows(store).len();
        self.selected.min(len.saturating_sub(1))
    }

    pub fn selected_row(&self, store: &LightStore) -> Option<Row> {
        let rows = rows(store);
        let index = self.selected.min(rows.len().saturating_sub(1));
        rows.into_iter().nth(index)
    }

    /// The selected room, or the room of the selected light
    pub fn selected_room<'a>(&self, store: &'a LightStore) -> Option<&'a Room> {
        match self.selected_row(store)? {
            Row::Room(index) | Row::Light { room: index, .. } => store.rooms().get(index),
        }
    }

    pub fn selected_light<'a>(&self, store: &'a LightStore) -> Option<&'a Light> {
        match self.selected_row(store)? {
            Row::Light { light, .. } => store.light(&light),
            Row::Room(_) => None,
        }
    }

    /// Scenes offered by the open picker
    pub fn scene_choices<'a>(&self, store: &'a LightStore) -> Vec<&'a Scene> {
        match &self.view {
            View::Scenes {
                room_id: Some(room_id),
                ..
            } => store.scenes_for_room(room_id).collect(),
            View::Scenes { room_id: None, .. } => store.scenes().iter().collect(),
            View::Lights => Vec::new(),
        }
    }

    /// Apply a key press and return the messages for the reconciler
    pub fn handle_key(&mut self, key: KeyCode, store: &LightStore) -> Vec<Message> {
        match self.view {
            View::Lights => self.handle_lights_key(key, store),
            View::Scenes { .. } => self.handle_scenes_key(key, store),
        }
    }

    fn handle_lights_key(&mut self, key: KeyCode, store: &LightStore) -> Vec<Message> {
        let row_count = rows(store).len();
        self.selected = self.selected.min(row_count.saturating_sub(1));

        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < row_count {
                    self.selected += 1;
                }
                Vec::new()
            }
            KeyCode::Left | KeyCode::Char('h') => self.step_brightness(store, false),
            KeyCode::Right | KeyCode::Char('l') => self.step_brightness(store, true),
            KeyCode::Char(' ') => self.toggle(store),
            KeyCode::Char(c @ '0'..='9') => self.light_messages(store, |light| {
                set_brightness(light, brightness_from_digit(c))
            }),
            KeyCode::Char('w') => self.light_messages(store, |light| step_mirek(light, true)),
            KeyCode::Char('c') => self.light_messages(store, |light| step_mirek(light, false)),
            KeyCode::Char('[') => self.light_messages(store, |light| step_hue_sat(light, -HUE_STEP, 0)),
            KeyCode::Char(']') => self.light_messages(store, |light| step_hue_sat(light, HUE_STEP, 0)),
            KeyCode::Char('-') => {
                self.light_messages(store, |light| step_hue_sat(light, 0, -SATURATION_STEP))
            }
            KeyCode::Char('=') | KeyCode::Char('+') => {
                self.light_messages(store, |light| step_hue_sat(light, 0, SATURATION_STEP))
            }
            KeyCode::Char('a') => self.room_on(store, true),
            KeyCode::Char('x') => self.room_on(store, false),
            KeyCode::Char('s') => {
                self.view = View::Scenes {
                    room_id: self.selected_room(store).map(|room| room.id.clone()),
                    selected: 0,
                };
                Vec::new()
            }
            KeyCode::Char('r') => vec![Message::Refresh],
            _ => Vec::new(),
        }
    }

    fn handle_scenes_key(&mut self, key: KeyCode, store: &LightStore) -> Vec<Message> {
        let choices: Vec<_> = self
            .scene_choices(store)
            .into_iter()
            .map(|scene| scene.id.clone())
            .collect();
        let View::Scenes { selected, .. } = &mut self.view else {
            return Vec::new();
        };

        match key {
            KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => {
                self.view = View::Lights;
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                *selected = selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if *selected + 1 < choices.len() {
                    *selected += 1;
                }
                Vec::new()
            }
            KeyCode::Enter => {
                let chosen = choices.get(*selected).cloned();
                self.view = View::Lights;
                chosen
                    .map(|scene_id| vec![Message::ActivateScene { scene_id }])
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    fn light_messages<F>(&self, store: &LightStore, f: F) -> Vec<Message>
    where
        F: FnOnce(&Light) -> Vec<LocalIntent>,
    {
        self.selected_light(store)
            .map(f)
            .unwrap_or_default()
            .into_iter()
            .map(Message::from)
            .collect()
    }

    fn step_brightness(&self, store: &LightStore, up: bool) -> Vec<Message> {
        let intents: Vec<LocalIntent> = match self.selected_row(store) {
            Some(Row::Room(index)) => store
                .rooms()
                .get(index)
                .map(|room| {
                    store
                        .room_lights(room)
                        .filter(|light| light.on())
                        .map(|light| {
                            LocalIntent::brightness_step(light.id.clone(), brightness_delta(up), ROOM_MIN_BRIGHTNESS)
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Some(Row::Light { light, .. }) => store
                .light(&light)
                .map(|light| step_light_brightness(light, up))
                .unwrap_or_default(),
            None => Vec::new(),
        };
        intents.into_iter().map(Message::from).collect()
    }

    fn toggle(&self, store: &LightStore) -> Vec<Message> {
        match self.selected_row(store) {
            Some(Row::Room(index)) => store
                .rooms()
                .get(index)
                .map(|room| {
                    vec![Message::GroupIntent {
                        room_id: room.id.clone(),
                        on: !room.any_on(),
                    }]
                })
                .unwrap_or_default(),
            Some(Row::Light { light, .. }) => store
                .light(&light)
                .map(|light| {
                    vec![Message::from(LocalIntent::exact(
                        light.id.clone(),
                        LightChange::On(!light.on()),
                    ))]
                })
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn room_on(&self, store: &LightStore, on: bool) -> Vec<Message> {
        self.selected_room(store)
            .map(|room| {
                vec![Message::GroupIntent {
                    room_id: room.id.clone(),
                    on,
                }]
            })
            .unwrap_or_default()
    }
}

/// `1`..`9` select 10%..90%, `0` selects full brightness
pub fn brightness_from_digit(digit: char) -> u8 {
    match digit.to_digit(10) {
        Some(0) | None => 100,
        Some(d) => (d * 10) as u8,
    }
}

fn brightness_delta(up: bool) -> i8 {
    if up {
        BRIGHTNESS_STEP as i8
    } else {
        -(BRIGHTNESS_STEP as i8)
    }
}

/// One brightness step on a light
///
/// Dimming to zero turns the light off; brightening an off light turns
/// it on at the first step.
fn step_light_brightness(light: &Light, up: bool) -> Vec<LocalIntent> {
    let id = light.id.clone();

    if light.on() {
        return vec![LocalIntent::brightness_step(id, brightness_delta(up), 0)];
    }
    if !up {
        return Vec::new();
    }
    vec![
        LocalIntent::exact(id.clone(), LightChange::On(true)),
        LocalIntent::new(id, LightChange::Brightness(BRIGHTNESS_STEP), Direction::Increasing),
    ]
}

fn set_brightness(light: &Light, target: u8) -> Vec<LocalIntent> {
    let mut intents = Vec::new();
    if !light.on() {
        intents.push(LocalIntent::exact(light.id.clone(), LightChange::On(true)));
    }
    intents.push(LocalIntent::brightness(light.id.clone(), light.brightness(), target));
    intents
}

/// Warmer is a higher mirek
fn step_mirek(light: &Light, warmer: bool) -> Vec<LocalIntent> {
    if !light.supports_color_temp || light.color().is_none() {
        return Vec::new();
    }
    let delta = if warmer { MIREK_STEP } else { -MIREK_STEP };
    vec![LocalIntent::color_temp_step(light.id.clone(), delta)]
}

fn step_hue_sat(light: &Light, hue: i32, saturation: i16) -> Vec<LocalIntent> {
    if !light.supports_color || light.color().is_none() {
        return Vec::new();
    }
    vec![LocalIntent::exact(
        light.id.clone(),
        LightChange::HueSatStep { hue, saturation },
    )]
}
