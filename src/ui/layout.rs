use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone, Copy)]
pub struct UiAreas {
    pub size: Rect,
    pub header: Rect,
    pub form: Rect,
    pub greeting: Rect,
    pub listener: Rect,
    pub submission: Rect,
    pub status_line: Rect,
    pub hint_line: Rect,
}

/// Input box and error line for each field, plus the submit button row
#[derive(Debug, Clone, Copy)]
pub struct FormAreas {
    pub inputs: [Rect; 3],
    pub errors: [Rect; 3],
    pub submit: Rect,
}

pub fn areas(size: Rect) -> UiAreas {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(size);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(vertical[1]);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .split(main_chunks[1]);

    let footer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(vertical[2]);

    UiAreas {
        size,
        header: vertical[0],
        form: main_chunks[0],
        greeting: side_chunks[0],
        listener: side_chunks[1],
        submission: side_chunks[2],
        status_line: footer_chunks[0],
        hint_line: footer_chunks[1],
    }
}

/// Split the inside of the form panel
pub fn form_areas(inner: Rect) -> FormAreas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    FormAreas {
        inputs: [rows[0], rows[2], rows[4]],
        errors: [rows[1], rows[3], rows[5]],
        submit: rows[6],
    }
}
