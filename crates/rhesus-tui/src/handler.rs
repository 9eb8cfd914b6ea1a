use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tokio::sync::mpsc::UnboundedSender;

use rhesus_core::chat::LlmCollaborator;
use rhesus_core::download;
use rhesus_core::provider::available_models;
use rhesus_core::structure::StructureSource;

use crate::app::{App, InputMode, Job};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) -> Result<()> {
    let jobs = match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => {
            handle_mouse(app, mouse);
            Vec::new()
        }
        AppEvent::Resize(_, _) => Vec::new(),
        AppEvent::Tick => {
            app.tick_animation();
            Vec::new()
        }
        AppEvent::Reply { exchange, reply } => app.apply_reply(exchange, reply),
        AppEvent::StructureFetched {
            widget,
            generation,
            result,
        } => {
            app.apply_structure(widget, generation, result);
            Vec::new()
        }
        AppEvent::DownloadFinished { widget, path } => {
            app.apply_download(widget, path);
            Vec::new()
        }
        AppEvent::ModelsLoaded(models) => {
            match models {
                Ok(models) => app.set_available_models(models),
                Err(e) => {
                    tracing::warn!("could not list models: {}", e);
                    app.set_available_models(Vec::new());
                }
            }
            Vec::new()
        }
    };

    for job in jobs {
        spawn_job(app, job, tx.clone());
    }
    Ok(())
}

/// Run a job in the background; its outcome comes back as an event
fn spawn_job(app: &App, job: Job, tx: UnboundedSender<AppEvent>) {
    match job {
        Job::Ask { pending, client } => {
            tokio::spawn(async move {
                let reply = client.reply(&pending.history, &pending.text).await;
                let _ = tx.send(AppEvent::Reply {
                    exchange: pending.exchange,
                    reply,
                });
            });
        }
        Job::FetchStructure {
            widget,
            generation,
            structure_id,
        } => {
            let source = app.structures.clone();
            tokio::spawn(async move {
                let result = source.fetch(&structure_id).await;
                let _ = tx.send(AppEvent::StructureFetched {
                    widget,
                    generation,
                    result,
                });
            });
        }
        Job::Download {
            widget,
            structure_id,
            filename,
        } => {
            let source = app.structures.clone();
            let dir = app.config.download_dir();
            tokio::spawn(async move {
                let path = download::download(&source, &structure_id, &filename, &dir).await;
                let _ = tx.send(AppEvent::DownloadFinished { widget, path });
            });
        }
        Job::ListModels(provider) => {
            let config = app.config.clone();
            tokio::spawn(async move {
                let models = available_models(provider, &config)
                    .await
                    .map_err(|e| e.to_string());
                let _ = tx.send(AppEvent::ModelsLoaded(models));
            });
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Job> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Vec::new();
    }

    if app.show_provider_picker {
        handle_provider_picker(app, key);
        return Vec::new();
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
        return Vec::new();
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_provider_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_provider_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.provider_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.provider_picker_nav_up(),
        KeyCode::Enter => app.select_provider(),
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Vec<Job> {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
            if key.code == KeyCode::Char('/') && app.query_input.is_empty() {
                app.query_input.push('/');
                app.query_cursor = 1;
            }
        }

        // Widgets
        KeyCode::Tab => app.select_next_widget(),
        KeyCode::BackTab => app.select_prev_widget(),
        KeyCode::Char('m') => return app.cycle_selected_mode(),
        KeyCode::Char('r') => return app.reload_selected(),
        KeyCode::Enter => return app.download_selected(),

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') => app.scroll_query_to_bottom(),

        // Detail pane scrolling
        KeyCode::Char('J') | KeyCode::PageDown => {
            app.widget_scroll = app.widget_scroll.saturating_add(5);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            app.widget_scroll = app.widget_scroll.saturating_sub(5);
        }

        // Pickers
        KeyCode::Char('P') => app.open_provider_picker(),
        KeyCode::Char('M') => return app.open_model_picker(),
        _ => {}
    }
    Vec::new()
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) -> Vec<Job> {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.select_next_widget();
        }
        KeyCode::Enter => return app.submit_input(),
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            app.query_cursor = app.query_input.chars().count();
        }
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
    Vec::new()
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(),
        MouseEventKind::ScrollDown => app.scroll_down(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use rhesus_core::config::Config;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn typing_respects_utf8_cursor() {
        let mut app = App::new(Config::new());
        for c in "αβ".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.query_input, "β");
        assert_eq!(app.query_cursor, 0);
    }

    #[test]
    fn escape_then_tab_selects_widgets() {
        let mut app = App::new(Config::new());
        app.query_input = "/view 1TUP".to_string();
        let jobs = handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(jobs.len(), 1);

        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_key(&mut app, press(KeyCode::Tab));
        assert_eq!(app.selected_widget, Some(0));

        let jobs = handle_key(&mut app, press(KeyCode::Char('m')));
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let mut app = App::new(Config::new());
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_key(&mut app, key);
        assert!(app.should_quit);
    }
}
