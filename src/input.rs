use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub(crate) enum UiEvent {
    Action(Action),
    Click { x: u16, y: u16 },
    FocusGained,
    FocusLost,
    Resized,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Action {
    Quit,
    RefreshWeather,
    CycleConditionOverride,
    CycleDayOverride,
    ClearStone,
    ToggleStats,
    ToggleUi,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<UiEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) => {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    if let Some(action) = map_key(k.code) {
                        out.push(UiEvent::Action(action));
                    }
                }
            }
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                ..
            }) => {
                out.push(UiEvent::Click { x: column, y: row });
            }
            Event::FocusGained => out.push(UiEvent::FocusGained),
            Event::FocusLost => out.push(UiEvent::FocusLost),
            Event::Resize(_, _) => out.push(UiEvent::Resized),
            _ => {}
        }
        if out.len() >= 32 {
            break;
        }
    }
    Ok(out)
}

fn map_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::RefreshWeather),
        KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::CycleConditionOverride),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::CycleDayOverride),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::ClearStone),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::ToggleStats),
        KeyCode::Char('u') | KeyCode::Char('U') => Some(Action::ToggleUi),
        _ => None,
    }
}
