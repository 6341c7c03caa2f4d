//! Application state and event handling.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use taskboard_proto::auth::{LoginRequest, RegisterRequest};
use taskboard_proto::task::{AddCommentRequest, CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::{Board, ColumnId, Priority, Role, Task, TaskId, User};

use crate::board::{BoardStore, MoveCommand, apply_move};
use crate::net::{NetCommand, NetEvent};
use crate::notifications::NotificationCache;
use crate::session::{Session, ThemeMode};
use crate::ui::theme::Palette;

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// The Kanban columns (default).
    Board,
    /// The notification list.
    Notifications,
}

/// A card that has been picked up and is being carried to a new slot.
///
/// `dest_index` follows the same convention as [`MoveCommand`]: for a
/// same-column move it is measured after the card has been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carry {
    /// Card being carried.
    pub task_id: TaskId,
    /// Column it was picked up from.
    pub source_column: ColumnId,
    /// Slot it was picked up from.
    pub source_index: usize,
    /// Target column, as an index into the column order.
    pub dest_column: usize,
    /// Target slot in the target column.
    pub dest_index: usize,
}

/// One-line feedback shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Text to show.
    pub text: String,
    /// Render as an error.
    pub is_error: bool,
}

const HELP: &str = "new <title> | comment <text> | title <text> | desc <text> | priority <high|medium|low|none> | \
assign [name] | delete | rename <title> | login <email> <pw> | register <user> <email> <pw> | logout | \
theme <light|dark|auto> | accent <#RRGGBB> | users | role <user> <admin|user> | deluser <user> | refresh | quit";

/// Main application state.
///
/// The board and notification data live in the shared stores; the app
/// only keeps what is needed to render and navigate them.
pub struct App {
    board: Arc<BoardStore>,
    notifications: Arc<NotificationCache>,
    session: Arc<Session>,
    /// Colors for the current theme and accent.
    pub palette: Palette,
    /// Which panel is focused.
    pub focus: PanelFocus,
    /// Selected column, as an index into the column order.
    pub selected_column: usize,
    /// Selected card within the selected column.
    pub selected_row: usize,
    /// Selected notification.
    pub selected_notification: usize,
    /// Card being moved, if any.
    pub carry: Option<Carry>,
    /// Command line contents while the `:` prompt is open.
    pub prompt: Option<String>,
    /// Signed-in account.
    pub current_user: Option<User>,
    /// Accounts listed by the last `:users`.
    pub users: Vec<User>,
    /// `false` when running against the built-in demo data.
    pub online: bool,
    /// Latest feedback line.
    pub status: Option<StatusMessage>,
    /// chrono format for absolute timestamps.
    pub timestamp_format: String,
    /// Column to select once a column update is saved.
    follow_column: Option<ColumnId>,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Create the application around the shared stores.
    #[must_use]
    pub fn new(
        board: Arc<BoardStore>,
        notifications: Arc<NotificationCache>,
        session: Arc<Session>,
        online: bool,
    ) -> Self {
        let palette = Palette::resolve(session.theme(), &session.accent_color());
        Self {
            board,
            notifications,
            session,
            palette,
            focus: PanelFocus::Board,
            selected_column: 0,
            selected_row: 0,
            selected_notification: 0,
            carry: None,
            prompt: None,
            current_user: None,
            users: Vec::new(),
            online,
            status: None,
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
            follow_column: None,
            should_quit: false,
        }
    }

    /// Set the absolute timestamp format.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// The board store.
    #[must_use]
    pub const fn board(&self) -> &Arc<BoardStore> {
        &self.board
    }

    /// The notification cache.
    #[must_use]
    pub const fn notifications(&self) -> &Arc<NotificationCache> {
        &self.notifications
    }

    /// Show an informational status line.
    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    /// Show an error status line.
    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }

    /// Whether the signed-in account may create tasks and manage users.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().is_some_and(|u| u.role.is_admin())
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Id of the selected column.
    #[must_use]
    pub fn selected_column_id(&self) -> Option<ColumnId> {
        self.board
            .snapshot()
            .column_order
            .get(self.selected_column)
            .cloned()
    }

    /// The selected card.
    #[must_use]
    pub fn selected_task(&self) -> Option<Task> {
        let board = self.board.snapshot();
        let column_id = board.column_order.get(self.selected_column)?;
        board
            .tasks_in(column_id)
            .get(self.selected_row)
            .map(|t| (*t).clone())
    }

    /// Keep the selection inside the current board.
    pub fn clamp_selection(&mut self) {
        let board = self.board.snapshot();
        self.selected_column = self
            .selected_column
            .min(board.column_order.len().saturating_sub(1));
        let rows = board
            .column_order
            .get(self.selected_column)
            .map_or(0, |id| board.tasks_in(id).len());
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        let notes = self.notifications.snapshot().len();
        self.selected_notification = self.selected_notification.min(notes.saturating_sub(1));
    }

    /// Select the card with the given id, wherever it is now.
    pub fn select_task(&mut self, task_id: &TaskId) {
        let board = self.board.snapshot();
        if let Some((column_id, row)) = board.position_of(task_id)
            && let Some(column) = board.column_order.iter().position(|c| c == &column_id)
        {
            self.selected_column = column;
            self.selected_row = row;
        }
    }

    // -----------------------------------------------------------------------
    // Carrying cards
    // -----------------------------------------------------------------------

    /// The move the current carry would perform if dropped now.
    #[must_use]
    pub fn carry_command(&self, board: &Board) -> Option<MoveCommand> {
        let carry = self.carry.as_ref()?;
        Some(MoveCommand {
            task_id: carry.task_id.clone(),
            source_column: carry.source_column.clone(),
            source_index: carry.source_index,
            dest_column: board.column_order.get(carry.dest_column)?.clone(),
            dest_index: carry.dest_index,
        })
    }

    /// The board as it would look if the carried card were dropped now.
    #[must_use]
    pub fn preview_board(&self) -> Arc<Board> {
        let board = self.board.snapshot();
        let Some(command) = self.carry_command(&board) else {
            return board;
        };
        let mut preview = Board::clone(&board);
        match apply_move(&mut preview, &command) {
            Ok(_) => Arc::new(preview),
            Err(_) => board,
        }
    }

    /// Largest valid drop slot in column `dest` for the current carry.
    fn max_drop_index(&self, board: &Board, dest: usize) -> usize {
        let Some(carry) = self.carry.as_ref() else {
            return 0;
        };
        let Some(column) = board
            .column_order
            .get(dest)
            .and_then(|id| board.columns.get(id))
        else {
            return 0;
        };
        if column.id == carry.source_column {
            column.task_ids.len().saturating_sub(1)
        } else {
            column.task_ids.len()
        }
    }

    fn pick_up(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        self.carry = Some(Carry {
            task_id: task.id,
            source_column: task.state,
            source_index: self.selected_row,
            dest_column: self.selected_column,
            dest_index: self.selected_row,
        });
    }

    fn shift_carry_column(&mut self, forward: bool) {
        let board = self.board.snapshot();
        let Some(carry) = self.carry.as_ref() else {
            return;
        };
        let dest = if forward {
            (carry.dest_column + 1).min(board.column_order.len().saturating_sub(1))
        } else {
            carry.dest_column.saturating_sub(1)
        };
        let max = self.max_drop_index(&board, dest);
        if let Some(carry) = self.carry.as_mut() {
            carry.dest_column = dest;
            carry.dest_index = carry.dest_index.min(max);
        }
    }

    fn shift_carry_row(&mut self, down: bool) {
        let board = self.board.snapshot();
        let Some(dest) = self.carry.as_ref().map(|c| c.dest_column) else {
            return;
        };
        let max = self.max_drop_index(&board, dest);
        if let Some(carry) = self.carry.as_mut() {
            carry.dest_index = if down {
                (carry.dest_index + 1).min(max)
            } else {
                carry.dest_index.saturating_sub(1)
            };
        }
    }

    /// Drop the carried card: apply the move locally and hand the pending
    /// confirmation to the network layer.
    fn drop_carried(&mut self) -> Option<NetCommand> {
        let board = self.board.snapshot();
        let command = self.carry_command(&board)?;
        let dest = self.carry.take().map_or(self.selected_column, |c| c.dest_column);
        let dest_index = command.dest_index;
        match self.board.begin_move(command) {
            Ok(None) => None,
            Ok(Some(pending)) => {
                self.selected_column = dest;
                self.selected_row = dest_index;
                Some(NetCommand::ConfirmMove(pending))
            }
            Err(e) => {
                self.set_error(format!("Cannot move card: {e}"));
                None
            }
        }
    }

    /// Swap the selected column with its neighbour and save the new order.
    fn shift_column(&mut self, forward: bool) -> Option<NetCommand> {
        let board = self.board.snapshot();
        let mut ordered: Vec<(ColumnId, String)> = board
            .ordered_columns()
            .iter()
            .map(|c| (c.id.clone(), c.title.clone()))
            .collect();
        let from = self.selected_column;
        let to = if forward { from + 1 } else { from.checked_sub(1)? };
        if to >= ordered.len() {
            return None;
        }
        ordered.swap(from, to);
        self.follow_column = Some(ordered[to].0.clone());
        Some(NetCommand::RenameColumns(ordered))
    }

    // -----------------------------------------------------------------------
    // Key handling
    // -----------------------------------------------------------------------

    /// Handle a key event.
    ///
    /// Returns `Some(NetCommand)` when the action needs the server.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<NetCommand> {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            self.should_quit = true;
            return None;
        }
        if self.prompt.is_some() {
            return self.handle_prompt_key(key);
        }
        if self.carry.is_some() {
            return self.handle_carry_key(key);
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                return None;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    PanelFocus::Board => PanelFocus::Notifications,
                    PanelFocus::Notifications => PanelFocus::Board,
                };
                return None;
            }
            KeyCode::Char(':') => {
                self.prompt = Some(String::new());
                return None;
            }
            KeyCode::Char('r') => return Some(NetCommand::Refresh),
            _ => {}
        }

        match self.focus {
            PanelFocus::Board => self.handle_board_key(key),
            PanelFocus::Notifications => self.handle_notifications_key(key),
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.clamp_selection();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.selected_column += 1;
                self.clamp_selection();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_row += 1;
                self.clamp_selection();
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.pick_up(),
            KeyCode::Char('<') => return self.shift_column(false),
            KeyCode::Char('>') => return self.shift_column(true),
            _ => {}
        }
        None
    }

    fn handle_carry_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Esc => self.carry = None,
            KeyCode::Left | KeyCode::Char('h') => self.shift_carry_column(false),
            KeyCode::Right | KeyCode::Char('l') => self.shift_carry_column(true),
            KeyCode::Up | KeyCode::Char('k') => self.shift_carry_row(false),
            KeyCode::Down | KeyCode::Char('j') => self.shift_carry_row(true),
            KeyCode::Char(' ') | KeyCode::Enter => return self.drop_carried(),
            _ => {}
        }
        None
    }

    fn handle_notifications_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_notification = self.selected_notification.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_notification += 1;
                self.clamp_selection();
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let items = self.notifications.snapshot();
                let item = items.get(self.selected_notification)?;
                if !item.read {
                    return Some(NetCommand::MarkRead(item.id.clone()));
                }
            }
            KeyCode::Char('a') => return Some(NetCommand::MarkAllRead),
            _ => {}
        }
        None
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        let prompt = self.prompt.as_mut()?;
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                if prompt.pop().is_none() {
                    self.prompt = None;
                }
            }
            KeyCode::Char(c) => prompt.push(c),
            KeyCode::Enter => {
                let line = self.prompt.take().unwrap_or_default();
                return self.execute_command(&line);
            }
            _ => {}
        }
        None
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Run one `:` command line.
    pub fn execute_command(&mut self, line: &str) -> Option<NetCommand> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match name {
            "" => None,
            "q" | "quit" => {
                self.should_quit = true;
                None
            }
            "help" => {
                self.set_info(HELP);
                None
            }
            "refresh" => Some(NetCommand::Refresh),
            "new" => self.command_new(rest),
            "comment" => self.command_comment(rest),
            "title" => self.command_patch(UpdateTaskRequest {
                title: Some(rest.to_string()),
                ..UpdateTaskRequest::default()
            }),
            "desc" => self.command_patch(UpdateTaskRequest {
                description: Some(rest.to_string()),
                ..UpdateTaskRequest::default()
            }),
            "priority" => {
                let Some(priority) = parse_priority(rest) else {
                    self.set_error(format!("Unknown priority: {rest}"));
                    return None;
                };
                self.command_patch(UpdateTaskRequest {
                    priority: Some(priority),
                    ..UpdateTaskRequest::default()
                })
            }
            "assign" => self.command_patch(UpdateTaskRequest {
                assignee: Some(rest.to_string()),
                ..UpdateTaskRequest::default()
            }),
            "delete" => match self.selected_task() {
                Some(task) => Some(NetCommand::DeleteTask(task.id)),
                None => {
                    self.set_error("No card selected");
                    None
                }
            },
            "rename" => self.command_rename(rest),
            "login" => self.command_login(rest),
            "register" => self.command_register(rest),
            "logout" => {
                if let Err(e) = self.session.set_token(None) {
                    self.set_error(format!("Could not clear session: {e}"));
                    return None;
                }
                self.current_user = None;
                self.users.clear();
                self.set_info("Signed out");
                None
            }
            "theme" => {
                match rest.parse::<ThemeMode>() {
                    Ok(mode) => match self.session.set_theme(mode) {
                        Ok(()) => {
                            self.reload_palette();
                            self.set_info(format!("Theme set to {mode}"));
                        }
                        Err(e) => self.set_error(e.to_string()),
                    },
                    Err(e) => self.set_error(e.to_string()),
                }
                None
            }
            "accent" => {
                match self.session.set_accent_color(rest) {
                    Ok(()) => {
                        self.reload_palette();
                        self.set_info(format!("Accent set to {}", self.session.accent_color()));
                    }
                    Err(e) => self.set_error(e.to_string()),
                }
                None
            }
            "users" => Some(NetCommand::ListUsers),
            "role" => self.command_role(rest),
            "deluser" => {
                let user = self.find_user(rest)?;
                Some(NetCommand::DeleteUser(user.id))
            }
            other => {
                self.set_error(format!("Unknown command: {other} (try :help)"));
                None
            }
        }
    }

    fn reload_palette(&mut self) {
        self.palette = Palette::resolve(self.session.theme(), &self.session.accent_color());
    }

    fn command_new(&mut self, title: &str) -> Option<NetCommand> {
        if !self.is_admin() {
            self.set_error("Only admins can create tasks");
            return None;
        }
        let state = self.selected_column_id()?;
        let request = CreateTaskRequest {
            title: title.to_string(),
            description: String::new(),
            priority: None,
            assignee: None,
            state,
        };
        if let Err(e) = request.validate() {
            self.set_error(e.to_string());
            return None;
        }
        Some(NetCommand::CreateTask(request))
    }

    fn command_comment(&mut self, content: &str) -> Option<NetCommand> {
        let Some(task) = self.selected_task() else {
            self.set_error("No card selected");
            return None;
        };
        let request = AddCommentRequest {
            content: content.to_string(),
        };
        if let Err(e) = request.validate() {
            self.set_error(e.to_string());
            return None;
        }
        Some(NetCommand::AddComment {
            task_id: task.id,
            content: request.content,
        })
    }

    fn command_patch(&mut self, patch: UpdateTaskRequest) -> Option<NetCommand> {
        let Some(task) = self.selected_task() else {
            self.set_error("No card selected");
            return None;
        };
        if let Err(e) = patch.validate() {
            self.set_error(e.to_string());
            return None;
        }
        Some(NetCommand::UpdateTask {
            task_id: task.id,
            patch,
        })
    }

    fn command_rename(&mut self, title: &str) -> Option<NetCommand> {
        let selected = self.selected_column_id()?;
        let board = self.board.snapshot();
        let ordered: Vec<(ColumnId, String)> = board
            .ordered_columns()
            .iter()
            .map(|c| {
                let title = if c.id == selected { title } else { c.title.as_str() };
                (c.id.clone(), title.to_string())
            })
            .collect();
        self.follow_column = Some(selected);
        Some(NetCommand::RenameColumns(ordered))
    }

    fn command_login(&mut self, args: &str) -> Option<NetCommand> {
        let mut parts = args.split_whitespace();
        let request = LoginRequest {
            email: parts.next().unwrap_or_default().to_string(),
            password: parts.next().unwrap_or_default().to_string(),
        };
        if let Err(e) = request.validate() {
            self.set_error(e.to_string());
            return None;
        }
        Some(NetCommand::Login(request))
    }

    fn command_register(&mut self, args: &str) -> Option<NetCommand> {
        let mut parts = args.split_whitespace();
        let request = RegisterRequest {
            username: parts.next().unwrap_or_default().to_string(),
            email: parts.next().unwrap_or_default().to_string(),
            password: parts.next().unwrap_or_default().to_string(),
        };
        if let Err(e) = request.validate() {
            self.set_error(e.to_string());
            return None;
        }
        Some(NetCommand::Register(request))
    }

    fn command_role(&mut self, args: &str) -> Option<NetCommand> {
        let (name, role) = args.rsplit_once(char::is_whitespace).unwrap_or((args, ""));
        let role = match role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => {
                self.set_error(e);
                return None;
            }
        };
        let user = self.find_user(name.trim())?;
        Some(NetCommand::SetRole {
            user_id: user.id,
            role,
        })
    }

    /// Look up a listed account by username or email.
    fn find_user(&mut self, name: &str) -> Option<User> {
        let found = self
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(name) || u.email.eq_ignore_ascii_case(name))
            .cloned();
        if found.is_none() {
            self.set_error(format!("No listed user named {name:?} (run :users first)"));
        }
        found
    }

    // -----------------------------------------------------------------------
    // Network events
    // -----------------------------------------------------------------------

    /// Apply one event from the network layer.
    pub fn apply_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::BoardLoaded => self.clamp_selection(),
            NetEvent::BoardLoadFailed(message) => {
                self.set_error(format!("Could not load board: {message}"));
            }
            NetEvent::MoveRolledBack { task_id, reason } => {
                self.select_task(&task_id);
                self.set_error(format!("Move reverted: {reason}"));
            }
            NetEvent::TaskCreated(task_id) => {
                self.select_task(&task_id);
                self.set_info("Task created");
            }
            NetEvent::TaskUpdated(task_id) => {
                self.select_task(&task_id);
                self.set_info("Task updated");
            }
            NetEvent::TaskDeleted(_) => {
                self.clamp_selection();
                self.set_info("Task deleted");
            }
            NetEvent::CommentAdded(_) => self.set_info("Comment added"),
            NetEvent::ColumnsSaved => {
                if let Some(column) = self.follow_column.take() {
                    let board = self.board.snapshot();
                    if let Some(index) = board.column_order.iter().position(|c| c == &column) {
                        self.selected_column = index;
                    }
                }
                self.clamp_selection();
                self.set_info("Columns saved");
            }
            NetEvent::SignedIn(user) => {
                self.set_info(format!("Signed in as {} ({})", user.username, user.role));
                self.current_user = Some(user);
            }
            NetEvent::SignedOut => {
                self.current_user = None;
                self.users.clear();
            }
            NetEvent::Users(users) => {
                self.set_info(format!("{} users", users.len()));
                self.users = users;
            }
            NetEvent::UserUpdated(user) => {
                if let Some(slot) = self.users.iter_mut().find(|u| u.id == user.id) {
                    *slot = user.clone();
                }
                if self.current_user.as_ref().is_some_and(|u| u.id == user.id) {
                    self.current_user = Some(user.clone());
                }
                self.set_info(format!("{} is now {}", user.username, user.role));
            }
            NetEvent::UserDeleted(user_id) => {
                self.users.retain(|u| u.id != user_id);
                self.set_info("User deleted");
            }
            NetEvent::Error(message) => {
                self.follow_column = None;
                self.set_error(message);
            }
        }
    }
}

/// Parse a priority argument into its wire value (`0` clears).
fn parse_priority(value: &str) -> Option<u8> {
    match value.to_ascii_lowercase().as_str() {
        "" | "none" | "0" => Some(0),
        "high" | "h" => Some(Priority::High.as_u8()),
        "medium" | "m" => Some(Priority::Medium.as_u8()),
        "low" | "l" => Some(Priority::Low.as_u8()),
        other => other
            .parse::<u8>()
            .ok()
            .and_then(|n| Priority::try_from(n).ok())
            .map(Priority::as_u8),
    }
}
