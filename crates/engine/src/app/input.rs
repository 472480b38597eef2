#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Attack,
    Interact,
    ToggleInventory,
    ToggleMenu,
    ToggleMusic,
    UseHealthPotion,
    UseManaPotion,
    AnswerOption1,
    AnswerOption2,
    AnswerOption3,
    AnswerOption4,
    Save,
    Load,
}

const ACTION_COUNT: usize = 17;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Attack,
        InputAction::Interact,
        InputAction::ToggleInventory,
        InputAction::ToggleMenu,
        InputAction::ToggleMusic,
        InputAction::UseHealthPotion,
        InputAction::UseManaPotion,
        InputAction::AnswerOption1,
        InputAction::AnswerOption2,
        InputAction::AnswerOption3,
        InputAction::AnswerOption4,
        InputAction::Save,
        InputAction::Load,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Attack => 4,
            InputAction::Interact => 5,
            InputAction::ToggleInventory => 6,
            InputAction::ToggleMenu => 7,
            InputAction::ToggleMusic => 8,
            InputAction::UseHealthPotion => 9,
            InputAction::UseManaPotion => 10,
            InputAction::AnswerOption1 => 11,
            InputAction::AnswerOption2 => 12,
            InputAction::AnswerOption3 => 13,
            InputAction::AnswerOption4 => 14,
            InputAction::Save => 15,
            InputAction::Load => 16,
        }
    }

    pub const fn answer_option(self) -> Option<usize> {
        match self {
            InputAction::AnswerOption1 => Some(0),
            InputAction::AnswerOption2 => Some(1),
            InputAction::AnswerOption3 => Some(2),
            InputAction::AnswerOption4 => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}
