use crate::cursor::{DayViewMode, DaySession, TimelineFocus};
use crate::grid;
use crate::model::{Priority, ScheduleError, Task, TimeOfDay, TimelineConfig};
use crate::scheduler::{Direction as Move, SchedulingController, SchedulingError};
use crate::storage::{save_store, DataLocation};
use crate::store::ScheduleStore;
use crate::view::DaySnapshot;
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::debug;

pub fn run(store: ScheduleStore, config: TimelineConfig, location: DataLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let today = Local::now().date_naive();
    let mut app = App::new(store, config, location, today);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    store: ScheduleStore,
    config: TimelineConfig,
    location: DataLocation,
    today: NaiveDate,
    calendar_cursor: NaiveDate,
    view: View,
    mode: Mode,
    status: String,
    last_save: Instant,
    calendar_layout: CalendarLayout,
    list_offset: usize,
    unscheduled_offset: usize,
    slot_offset: usize,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CalendarLayout {
    Month,
    Week,
}

enum View {
    Calendar,
    Day(DaySession),
}

enum Mode {
    Normal,
    Creating(TaskForm),
    Editing { index: usize, form: TaskForm },
    ConfirmDelete { index: usize, title: String },
    QuickSchedule(QuickScheduleInput),
    Search(SearchInput),
    Help,
}

struct SearchInput {
    query: FieldValue,
    selection: usize,
}

struct QuickScheduleInput {
    index: usize,
    title: String,
    input: FieldValue,
    error: Option<String>,
}

struct TaskForm {
    title: FieldValue,
    description: FieldValue,
    priority: Priority,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Description,
    Priority,
}

enum FormAction {
    Create,
    Edit(usize),
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(
        store: ScheduleStore,
        config: TimelineConfig,
        location: DataLocation,
        today: NaiveDate,
    ) -> Self {
        let status = format!("Loaded tasks from {}", location.todos.display());
        App {
            store,
            config,
            location,
            today,
            calendar_cursor: today,
            view: View::Calendar,
            mode: Mode::Normal,
            status,
            last_save: Instant::now(),
            calendar_layout: CalendarLayout::Month,
            list_offset: 0,
            unscheduled_offset: 0,
            slot_offset: 0,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
            Mode::QuickSchedule(_) => self.handle_quick_schedule_key(key),
            Mode::Search(_) => self.handle_search_key(key),
            Mode::Help => {
                self.mode = Mode::Normal;
                Ok(false)
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('a') => {
                self.mode = Mode::Creating(TaskForm::new());
                self.status = format!(
                    "New task for {} (Tab move, Enter save, Esc cancel)",
                    self.active_date()
                );
                return Ok(false);
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Search(SearchInput {
                    query: FieldValue::new(""),
                    selection: 0,
                });
                self.status = "Search titles and descriptions (↑/↓ pick, Enter open, Esc close)".into();
                return Ok(false);
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                return Ok(false);
            }
            _ => {}
        }
        match self.view {
            View::Calendar => self.handle_calendar_key(key),
            View::Day(_) => self.handle_day_key(key),
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.shift_calendar(-1),
            KeyCode::Right | KeyCode::Char('l') => self.shift_calendar(1),
            KeyCode::Up | KeyCode::Char('k') => self.shift_calendar(-7),
            KeyCode::Down | KeyCode::Char('j') => self.shift_calendar(7),
            KeyCode::Char('b') => match self.calendar_layout {
                CalendarLayout::Month => self.shift_month(-1),
                CalendarLayout::Week => self.shift_calendar(-7),
            },
            KeyCode::Char('n') => match self.calendar_layout {
                CalendarLayout::Month => self.shift_month(1),
                CalendarLayout::Week => self.shift_calendar(7),
            },
            KeyCode::Char('g') => {
                self.calendar_cursor = self.today;
                self.status = "Jumped to today".into();
            }
            KeyCode::Char('m') => {
                self.calendar_layout = CalendarLayout::Month;
                self.status = "Month view".into();
            }
            KeyCode::Char('w') => {
                self.calendar_layout = CalendarLayout::Week;
                self.status = "Week view".into();
            }
            KeyCode::Enter | KeyCode::Char('d') => self.enter_day_view(),
            _ => {}
        }
        Ok(false)
    }

    fn handle_day_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => {
                self.leave_day_view();
                return Ok(false);
            }
            KeyCode::Char('T') => {
                if let View::Day(session) = &mut self.view {
                    session.toggle_mode();
                    self.status = format!("Day view: {} mode", session.mode.label());
                }
                return Ok(false);
            }
            KeyCode::Char('[') => {
                self.change_day(-1);
                return Ok(false);
            }
            KeyCode::Char(']') => {
                self.change_day(1);
                return Ok(false);
            }
            KeyCode::Char(' ') => return self.toggle_selected().map(|_| false),
            KeyCode::Char('p') => return self.set_selected_priority(Priority::cycle).map(|_| false),
            KeyCode::Char(c @ '0'..='3') => {
                let level = c as u8 - b'0';
                let Ok(priority) = Priority::try_from(level) else {
                    return Ok(false);
                };
                return self.set_selected_priority(|_| priority).map(|_| false);
            }
            KeyCode::Char('e') => {
                self.begin_edit();
                return Ok(false);
            }
            KeyCode::Char('d') => {
                self.begin_delete();
                return Ok(false);
            }
            _ => {}
        }

        let mode = match &self.view {
            View::Day(session) => session.mode,
            View::Calendar => return Ok(false),
        };
        match (mode, key.code) {
            (DayViewMode::List, KeyCode::Char('J')) => self.move_selected(1)?,
            (DayViewMode::List, KeyCode::Char('K')) => self.move_selected(-1)?,
            (DayViewMode::List, _) => self.handle_list_key(key),
            (DayViewMode::Timeline, _) => self.handle_timeline_key(key)?,
        }
        self.ensure_day_bounds();
        Ok(false)
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let count = self.store.tasks(self.active_date()).len();
        let View::Day(session) = &mut self.view else {
            return;
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => session.move_list_selection(-1, count),
            KeyCode::Down | KeyCode::Char('j') => session.move_list_selection(1, count),
            KeyCode::Char('g') => session.move_list_selection(-(count as isize), count),
            KeyCode::Char('G') => session.move_list_selection(count as isize, count),
            _ => {}
        }
    }

    fn handle_timeline_key(&mut self, key: KeyEvent) -> Result<()> {
        let unscheduled = self.store.partition(self.active_date()).unscheduled.len();
        let config = self.config;
        let View::Day(session) = &mut self.view else {
            return Ok(());
        };
        let focus = session.cursor.focus();
        match (key.code, focus) {
            (KeyCode::Tab | KeyCode::BackTab, _) => session.cursor.toggle_focus(),
            (KeyCode::Up | KeyCode::Char('k'), TimelineFocus::Unscheduled) => {
                session.cursor.move_unscheduled_selection(-1, unscheduled)
            }
            (KeyCode::Down | KeyCode::Char('j'), TimelineFocus::Unscheduled) => {
                session.cursor.move_unscheduled_selection(1, unscheduled)
            }
            (KeyCode::Up | KeyCode::Char('k'), TimelineFocus::Timeline) => {
                session.cursor.move_slot(-1, &config)
            }
            (KeyCode::Down | KeyCode::Char('j'), TimelineFocus::Timeline) => {
                session.cursor.move_slot(1, &config)
            }
            (KeyCode::Enter, _) => self.assign_at_cursor()?,
            (KeyCode::Char('s'), _) => self.begin_quick_schedule(),
            (KeyCode::Char('u'), TimelineFocus::Timeline) => self.unschedule_at_cursor()?,
            (KeyCode::Char('+') | KeyCode::Char('='), TimelineFocus::Timeline) => {
                self.adjust_duration(1)?
            }
            (KeyCode::Char('-') | KeyCode::Char('_'), TimelineFocus::Timeline) => {
                self.adjust_duration(-1)?
            }
            (KeyCode::Char('J'), TimelineFocus::Timeline) => self.reposition(Move::Later)?,
            (KeyCode::Char('K'), TimelineFocus::Timeline) => self.reposition(Move::Earlier)?,
            _ => {}
        }
        Ok(())
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Creating(form) => self.process_form_key(FormAction::Create, form, key)?,
            Mode::Editing { index, form } => {
                self.process_form_key(FormAction::Edit(*index), form, key)?
            }
            _ => true,
        };
        self.mode = if close_form { Mode::Normal } else { mode };
        Ok(false)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let (index, title) = match &self.mode {
            Mode::ConfirmDelete { index, title } => (*index, title.clone()),
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.mode = Mode::Normal;
                match self.store.delete(self.active_date(), index) {
                    Ok(_) => self.persist(format!("Deleted \"{}\"", title))?,
                    Err(err) => self.status = format!("Delete failed: {}", err),
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Delete canceled".into();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_quick_schedule_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Mode::QuickSchedule(mut pending) = std::mem::replace(&mut self.mode, Mode::Normal)
        else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Esc => {
                self.status = "Scheduling canceled".into();
                return Ok(false);
            }
            KeyCode::Enter => {
                let outcome = self
                    .with_controller(|c| c.quick_schedule(pending.index, &pending.input.value));
                match outcome {
                    Some(Ok(placed)) => {
                        self.follow_to_slot(placed.range.start);
                        self.persist(format!(
                            "Scheduled \"{}\" at {}",
                            pending.title, placed.range
                        ))?;
                        return Ok(false);
                    }
                    Some(Err(err)) => pending.error = Some(capitalize(&err.to_string())),
                    None => return Ok(false),
                }
            }
            KeyCode::Left => pending.input.move_left(),
            KeyCode::Right => pending.input.move_right(),
            KeyCode::Backspace => {
                pending.input.backspace();
                pending.error = None;
            }
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    pending.input.insert_char(c);
                    pending.error = None;
                }
            }
            _ => {}
        }
        self.mode = Mode::QuickSchedule(pending);
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Mode::Search(mut search) = std::mem::replace(&mut self.mode, Mode::Normal) else {
            return Ok(false);
        };
        let hits = self.store.search(&search.query.value).len();
        match key.code {
            KeyCode::Esc => {
                self.status = "Search closed".into();
                return Ok(false);
            }
            KeyCode::Enter => {
                let hit = self
                    .store
                    .search(&search.query.value)
                    .get(search.selection)
                    .map(|hit| (hit.date, hit.index));
                match hit {
                    Some((date, index)) => {
                        self.open_search_hit(date, index);
                        return Ok(false);
                    }
                    None => self.status = format!("Nothing matches {:?}", search.query.value),
                }
            }
            KeyCode::Up => search.selection = search.selection.saturating_sub(1),
            KeyCode::Down => {
                search.selection = (search.selection + 1).min(hits.saturating_sub(1));
            }
            KeyCode::Left => search.query.move_left(),
            KeyCode::Right => search.query.move_right(),
            KeyCode::Backspace => {
                search.query.backspace();
                search.selection = 0;
            }
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    search.query.insert_char(c);
                    search.selection = 0;
                }
            }
            _ => {}
        }
        self.mode = Mode::Search(search);
        Ok(false)
    }

    /// Opens the Day View of `date` in list mode with task `index` selected.
    fn open_search_hit(&mut self, date: NaiveDate, index: usize) {
        self.calendar_cursor = date;
        self.enter_day_view();
        let position = DaySnapshot::build(&self.store, date, &self.config)
            .list_entries()
            .iter()
            .position(|(i, _)| *i == index)
            .unwrap_or(0);
        let count = self.store.tasks(date).len();
        if let View::Day(session) = &mut self.view {
            session.move_list_selection(position as isize, count);
        }
        self.status = format!("Found \"{}\" on {}", self.title_of(index), date);
    }

    fn process_form_key(
        &mut self,
        action: FormAction,
        form: &mut TaskForm,
        key: KeyEvent,
    ) -> Result<bool> {
        let mut close_form = false;
        match key.code {
            KeyCode::Esc => {
                close_form = true;
                self.status = "Canceled".into();
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left => match form.field {
                FormField::Priority => form.priority = prev_priority(form.priority),
                _ => form.active_field_mut().move_left(),
            },
            KeyCode::Right => match form.field {
                FormField::Priority => form.priority = form.priority.cycle(),
                _ => form.active_field_mut().move_right(),
            },
            KeyCode::Enter => {
                let control = key.modifiers.contains(KeyModifiers::CONTROL);
                if form.field == FormField::Description && control {
                    form.active_field_mut().insert_char('\n');
                } else {
                    close_form = self.try_submit(action, form)?;
                }
            }
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if form.field == FormField::Priority {
                    if c == ' ' {
                        form.priority = form.priority.cycle();
                    }
                } else if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    form.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        Ok(close_form)
    }

    fn try_submit(&mut self, action: FormAction, form: &TaskForm) -> Result<bool> {
        let date = self.active_date();
        let title = form.title.value.trim().to_string();
        let description = form.description.value.trim().to_string();
        match action {
            FormAction::Create => {
                let task = Task::new(title.clone())
                    .with_description(description)
                    .with_priority(form.priority);
                match self.store.add(date, task) {
                    Ok(_) => {
                        self.persist(format!("Added \"{}\" on {}", title, date))?;
                        Ok(true)
                    }
                    Err(err) => {
                        self.status = format!("Could not add: {}", err);
                        Ok(false)
                    }
                }
            }
            FormAction::Edit(index) => {
                let updated = self.store.task(date, index).cloned().and_then(|existing| {
                    let task = Task {
                        title: title.clone(),
                        description,
                        priority: form.priority,
                        ..existing
                    };
                    if task.title.is_empty() {
                        return Err(ScheduleError::EmptyTitle);
                    }
                    self.store.save(date, index, task)
                });
                match updated {
                    Ok(()) => {
                        self.persist(format!("Updated \"{}\"", title))?;
                        Ok(true)
                    }
                    Err(err) => {
                        self.status = format!("Could not edit: {}", err);
                        Ok(false)
                    }
                }
            }
        }
    }

    fn enter_day_view(&mut self) {
        let session = DaySession::enter(self.calendar_cursor);
        self.status = format!("Day view for {}", session.date.format("%A %Y-%m-%d"));
        self.view = View::Day(session);
        self.list_offset = 0;
        self.unscheduled_offset = 0;
        self.slot_offset = 0;
    }

    fn leave_day_view(&mut self) {
        if let View::Day(session) = &self.view {
            self.calendar_cursor = session.date;
        }
        self.view = View::Calendar;
        self.status = "Back to calendar".into();
    }

    fn change_day(&mut self, days: i64) {
        if let View::Day(session) = &mut self.view {
            let date = session.date + ChronoDuration::days(days);
            session.change_date(date);
            self.calendar_cursor = date;
            self.status = format!("Day view for {}", date.format("%A %Y-%m-%d"));
        }
    }

    fn shift_calendar(&mut self, days: i64) {
        self.calendar_cursor += ChronoDuration::days(days);
    }

    fn shift_month(&mut self, months: i32) {
        let total = self.calendar_cursor.year() * 12 + self.calendar_cursor.month0() as i32 + months;
        let (year, month) = (total.div_euclid(12), total.rem_euclid(12) as u32 + 1);
        let day = self.calendar_cursor.day().min(days_in_month(year, month));
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            self.calendar_cursor = date;
        }
    }

    fn active_date(&self) -> NaiveDate {
        match &self.view {
            View::Day(session) => session.date,
            View::Calendar => self.calendar_cursor,
        }
    }

    fn with_controller<T>(
        &mut self,
        f: impl FnOnce(&mut SchedulingController<'_>) -> T,
    ) -> Option<T> {
        let View::Day(session) = &mut self.view else {
            return None;
        };
        let date = session.date;
        let mut controller =
            SchedulingController::new(&mut self.store, &self.config, &mut session.cursor, date);
        Some(f(&mut controller))
    }

    /// Store index of the task the current panel points at.
    fn selected_index(&mut self) -> Option<usize> {
        let (date, mode, focus, selection) = match &self.view {
            View::Day(s) => (s.date, s.mode, s.cursor.focus(), s.list_selection()),
            View::Calendar => return None,
        };
        match mode {
            DayViewMode::List => DaySnapshot::build(&self.store, date, &self.config)
                .list_entries()
                .get(selection)
                .map(|(index, _)| *index),
            DayViewMode::Timeline => self
                .with_controller(|c| match focus {
                    TimelineFocus::Timeline => c.task_under_cursor(),
                    TimelineFocus::Unscheduled => c.selected_unscheduled(),
                })
                .flatten(),
        }
    }

    fn title_of(&self, index: usize) -> String {
        self.store
            .task(self.active_date(), index)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    }

    fn toggle_selected(&mut self) -> Result<()> {
        let Some(index) = self.selected_index() else {
            self.status = "No task selected".into();
            return Ok(());
        };
        match self.store.toggle_complete(self.active_date(), index) {
            Ok(done) => {
                let verb = if done { "Completed" } else { "Reopened" };
                self.persist(format!("{} \"{}\"", verb, self.title_of(index)))
            }
            Err(err) => {
                self.status = capitalize(&err.to_string());
                Ok(())
            }
        }
    }

    fn set_selected_priority(&mut self, choose: impl FnOnce(Priority) -> Priority) -> Result<()> {
        let Some(index) = self.selected_index() else {
            self.status = "No task selected".into();
            return Ok(());
        };
        let date = self.active_date();
        let next = match self.store.task(date, index) {
            Ok(task) => choose(task.priority),
            Err(err) => {
                self.status = capitalize(&err.to_string());
                return Ok(());
            }
        };
        if let Err(err) = self.store.set_priority(date, index, next) {
            self.status = capitalize(&err.to_string());
            return Ok(());
        }
        self.persist(format!("Priority set to {}", next.label()))
    }

    /// Swaps the selected list entry with its neighbour. Only unscheduled tasks move;
    /// scheduled ones are listed by start time.
    fn move_selected(&mut self, step: isize) -> Result<()> {
        let (date, selection) = match &self.view {
            View::Day(session) => (session.date, session.list_selection()),
            View::Calendar => return Ok(()),
        };
        let entries: Vec<(usize, bool)> = DaySnapshot::build(&self.store, date, &self.config)
            .list_entries()
            .iter()
            .map(|(index, task)| (*index, task.is_scheduled()))
            .collect();
        let neighbour = selection
            .checked_add_signed(step)
            .and_then(|target| entries.get(target));
        let (Some(&(from, from_scheduled)), Some(&(to, to_scheduled))) =
            (entries.get(selection), neighbour)
        else {
            return Ok(());
        };
        if from_scheduled || to_scheduled {
            self.status = "Scheduled tasks are ordered by start time".into();
            return Ok(());
        }
        if let Err(err) = self.store.reorder(date, from, to) {
            self.status = capitalize(&err.to_string());
            return Ok(());
        }
        if let View::Day(session) = &mut self.view {
            session.move_list_selection(step, entries.len());
        }
        let direction = if step < 0 { "up" } else { "down" };
        self.persist(format!("Moved \"{}\" {}", self.title_of(to), direction))
    }

    fn begin_edit(&mut self) {
        let Some(index) = self.selected_index() else {
            self.status = "No task selected to edit".into();
            return;
        };
        if let Ok(task) = self.store.task(self.active_date(), index) {
            self.status = format!("Editing \"{}\"", task.title);
            self.mode = Mode::Editing {
                index,
                form: TaskForm::from_task(task),
            };
        }
    }

    fn begin_delete(&mut self) {
        let Some(index) = self.selected_index() else {
            self.status = "No task selected to delete".into();
            return;
        };
        let title = self.title_of(index);
        self.status = format!("Delete \"{}\"? (y to confirm, n/Esc to cancel)", title);
        self.mode = Mode::ConfirmDelete { index, title };
    }

    fn begin_quick_schedule(&mut self) {
        let Some(index) = self.selected_index() else {
            self.status = "No task selected to schedule".into();
            return;
        };
        let current = self
            .store
            .task(self.active_date(), index)
            .ok()
            .and_then(|t| t.schedule)
            .map(|r| r.to_string())
            .unwrap_or_default();
        self.mode = Mode::QuickSchedule(QuickScheduleInput {
            index,
            title: self.title_of(index),
            input: FieldValue::new(&current),
            error: None,
        });
        self.status = "Enter HH:MM or HH:MM-HH:MM (Enter save, Esc cancel)".into();
    }

    fn assign_at_cursor(&mut self) -> Result<()> {
        let Some(outcome) = self.with_controller(|c| c.assign_at_cursor()) else {
            return Ok(());
        };
        let outcome = outcome.map(|placed| {
            format!("Scheduled \"{}\" at {}", self.title_of(placed.index), placed.range)
        });
        self.report(outcome)
    }

    fn unschedule_at_cursor(&mut self) -> Result<()> {
        let Some(outcome) = self.with_controller(|c| c.unschedule()) else {
            return Ok(());
        };
        let outcome = outcome.map(|placed| {
            format!("Unscheduled \"{}\" (was {})", self.title_of(placed.index), placed.range)
        });
        self.report(outcome)
    }

    fn adjust_duration(&mut self, delta_slots: i64) -> Result<()> {
        let Some(outcome) = self.with_controller(|c| c.adjust_duration(delta_slots)) else {
            return Ok(());
        };
        self.report(outcome.map(|end| format!("Now ends at {}", end)))
    }

    fn reposition(&mut self, direction: Move) -> Result<()> {
        let Some(outcome) = self.with_controller(|c| c.reposition(direction)) else {
            return Ok(());
        };
        let config = self.config;
        self.report(outcome.map(|range| {
            if grid::is_slot_aligned(&config, range.start) {
                format!("Moved to {}", range)
            } else {
                format!(
                    "Moved to {} (starts between slots; set move_minutes to a multiple of {} to keep moving it)",
                    range, config.slot_minutes
                )
            }
        }))
    }

    /// Persists on success; a rejected intent only updates the status line.
    fn report(&mut self, outcome: Result<String, SchedulingError>) -> Result<()> {
        match outcome {
            Ok(message) => self.persist(message),
            Err(err) => {
                debug!(%err, "scheduling intent rejected");
                self.status = capitalize(&err.to_string());
                Ok(())
            }
        }
    }

    fn follow_to_slot(&mut self, time: TimeOfDay) {
        let config = self.config;
        if let View::Day(session) = &mut self.view {
            if session.mode == DayViewMode::Timeline && grid::is_slot_aligned(&config, time) {
                session.cursor.jump_to(time, &config);
            }
        }
    }

    fn ensure_day_bounds(&mut self) {
        let date = self.active_date();
        let total = self.store.tasks(date).len();
        let unscheduled = self.store.partition(date).unscheduled.len();
        let config = self.config;
        if let View::Day(session) = &mut self.view {
            session.clamp_list_selection(total);
            session.cursor.clamp(unscheduled, &config);
        }
    }

    fn persist(&mut self, message: impl Into<String>) -> Result<()> {
        save_store(&self.location.todos, &self.store)?;
        self.last_save = Instant::now();
        self.status = message.into();
        self.ensure_day_bounds();
        Ok(())
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let mode = match &self.view {
            View::Calendar => None,
            View::Day(session) => Some(session.mode),
        };
        match mode {
            None => self.draw_calendar(f, layout[1]),
            Some(DayViewMode::List) => self.draw_day_list(f, layout[1]),
            Some(DayViewMode::Timeline) => self.draw_timeline(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, "New Task", form),
            Mode::Editing { form, .. } => self.draw_form(f, "Edit Task", form),
            Mode::ConfirmDelete { title, .. } => self.draw_confirm(f, title),
            Mode::QuickSchedule(pending) => self.draw_quick_schedule(f, pending),
            Mode::Search(search) => self.draw_search(f, search),
            Mode::Help => self.draw_help(f),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let view = match &self.view {
            View::Calendar => match self.calendar_layout {
                CalendarLayout::Month => "calendar • month".to_string(),
                CalendarLayout::Week => "calendar • week".to_string(),
            },
            View::Day(session) => format!("day • {}", session.mode.label()),
        };
        let title = Line::from(vec![
            Span::styled(
                "chronoflow ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.active_date().format("%a %Y-%m-%d").to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(view, Style::default().fg(Color::Magenta)),
            Span::raw("  •  "),
            Span::styled(
                format!(
                    "{}-{} / {}m",
                    self.config.day_start, self.config.day_end, self.config.slot_minutes
                ),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_calendar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        match self.calendar_layout {
            CalendarLayout::Month => self.draw_month(f, area),
            CalendarLayout::Week => self.draw_week(f, area),
        }
    }

    fn draw_week(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let monday = week_start(self.calendar_cursor);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(3)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, 7); 7])
            .split(rows[0]);

        for (offset, column) in columns.iter().enumerate() {
            let date = monday + ChronoDuration::days(offset as i64);
            let snapshot = DaySnapshot::build(&self.store, date, &self.config);
            let entries = snapshot.list_entries();
            let lines: Vec<Line> = if entries.is_empty() {
                vec![Line::from(Span::styled("·", Style::default().fg(Color::DarkGray)))]
            } else {
                entries
                    .iter()
                    .map(|(_, task)| week_entry(task, date, self.today))
                    .collect()
            };
            let mut title = date.format("%a %d").to_string();
            if date == self.today {
                title.push_str(" •");
            }
            let column_view = Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .block(focused_block(title, date == self.calendar_cursor));
            f.render_widget(column_view, *column);
        }

        let stats = self
            .store
            .stats_between(monday, monday + ChronoDuration::days(7), self.today);
        let summary = Line::from(vec![
            Span::styled(
                format!("Week of {}  ", monday.format("%Y-%m-%d")),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{} tasks  ", stats.total)),
            Span::styled(
                format!("{} done  ", stats.completed),
                Style::default().fg(Color::LightGreen),
            ),
            Span::styled(
                format!("{} overdue", stats.overdue),
                Style::default().fg(Color::LightRed),
            ),
        ]);
        let summary = Paragraph::new(summary).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(summary, rows[1]);
    }

    fn draw_month(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let sections = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let cursor = self.calendar_cursor;
        let month_start = cursor.with_day(1).unwrap_or(cursor);
        let days = days_in_month(month_start.year(), month_start.month());
        let start_offset = month_start.weekday().num_days_from_monday();
        let mut lines = vec![Line::from(Span::styled(
            format!("{} {}", month_start.format("%B"), month_start.year()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))];
        let headings = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
        lines.push(Line::from(
            headings
                .iter()
                .map(|h| Span::styled(format!("{:^7}", h), Style::default().fg(Color::Gray)))
                .collect::<Vec<_>>(),
        ));

        let mut day: i32 = 1 - start_offset as i32;
        while day <= days as i32 {
            let mut spans = Vec::new();
            for _ in 0..7 {
                let date = u32::try_from(day)
                    .ok()
                    .filter(|d| (1..=days).contains(d))
                    .and_then(|d| month_start.with_day(d));
                match date {
                    None => spans.push(Span::raw("       ")),
                    Some(date) => spans.push(self.calendar_cell(date)),
                }
                day += 1;
            }
            lines.push(Line::from(spans));
        }

        let calendar = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Calendar",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(calendar, sections[0]);

        let month_end = month_start + ChronoDuration::days(i64::from(days));
        let month_stats = self.store.stats_between(month_start, month_end, self.today);
        let mut detail = vec![
            Line::from(Span::styled(
                cursor.format("%A %Y-%m-%d").to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        let snapshot = DaySnapshot::build(&self.store, cursor, &self.config);
        let entries = snapshot.list_entries();
        if entries.is_empty() {
            detail.push(Line::from("No tasks"));
        }
        for (_, task) in entries {
            detail.push(task_line(task, cursor, self.today));
        }
        detail.push(Line::from(""));
        detail.push(Line::from(Span::styled(
            format!(
                "This month: {} tasks, {} done, {} overdue",
                month_stats.total, month_stats.completed, month_stats.overdue
            ),
            Style::default().fg(Color::Gray),
        )));
        let panel = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .title("Day")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(panel, sections[1]);
    }

    fn calendar_cell(&self, date: NaiveDate) -> Span<'static> {
        let tasks = self.store.tasks(date);
        let open = tasks.iter().filter(|t| !t.complete).count();
        let text = if tasks.is_empty() {
            format!("{:>3}    ", date.day())
        } else {
            format!("{:>3}({:>2})", date.day(), tasks.len())
        };
        let mut style = Style::default().fg(if tasks.is_empty() {
            Color::Gray
        } else if open == 0 {
            Color::LightGreen
        } else if date < self.today {
            Color::LightRed
        } else {
            Color::LightYellow
        });
        if date == self.today {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if date == self.calendar_cursor {
            style = style
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD);
        }
        Span::styled(text, style)
    }

    fn draw_day_list(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let View::Day(session) = &self.view else {
            return;
        };
        let date = session.date;
        let selection = session.list_selection();
        let snapshot = DaySnapshot::build(&self.store, date, &self.config);
        let entries = snapshot.list_entries();
        let items: Vec<ListItem> = if entries.is_empty() {
            vec![ListItem::new("No tasks (a to add)")]
        } else {
            entries
                .iter()
                .map(|(_, task)| ListItem::new(task_line(task, date, self.today)))
                .collect()
        };
        let viewport = area.height.saturating_sub(2) as usize;
        let selected = selection.min(entries.len().saturating_sub(1));
        let offset = scroll_offset(selected, self.list_offset, viewport, 1, entries.len());
        let mut state = ListState::default();
        *state.offset_mut() = offset;
        if !entries.is_empty() {
            state.select(Some(selected));
        }
        let stats = self.store.stats_for(date, self.today);
        let list = List::new(items)
            .block(focused_block(
                format!(
                    "Tasks ({} total, {} done, {} overdue)",
                    stats.total, stats.completed, stats.overdue
                ),
                true,
            ))
            .highlight_style(highlight_style());
        f.render_stateful_widget(list, area, &mut state);
        self.list_offset = offset;
    }

    fn draw_timeline(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let View::Day(session) = &self.view else {
            return;
        };
        let date = session.date;
        let cursor = session.cursor;
        let snapshot = DaySnapshot::build(&self.store, date, &self.config);
        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);

        let unscheduled_focus = cursor.focus() == TimelineFocus::Unscheduled;
        let items: Vec<ListItem> = if snapshot.unscheduled.is_empty() {
            vec![ListItem::new("Nothing left to schedule")]
        } else {
            snapshot
                .unscheduled
                .iter()
                .map(|(_, task)| ListItem::new(task_line(task, date, self.today)))
                .collect()
        };
        let viewport = panels[0].height.saturating_sub(2) as usize;
        let selected = cursor
            .unscheduled_selection()
            .min(snapshot.unscheduled.len().saturating_sub(1));
        let offset = scroll_offset(
            selected,
            self.unscheduled_offset,
            viewport,
            1,
            snapshot.unscheduled.len(),
        );
        let mut state = ListState::default();
        *state.offset_mut() = offset;
        if !snapshot.unscheduled.is_empty() {
            state.select(Some(selected));
        }
        let list = List::new(items)
            .block(focused_block(
                format!("Unscheduled ({})", snapshot.unscheduled.len()),
                unscheduled_focus,
            ))
            .highlight_style(if unscheduled_focus {
                highlight_style()
            } else {
                Style::default().add_modifier(Modifier::REVERSED)
            });
        f.render_stateful_widget(list, panels[0], &mut state);
        self.unscheduled_offset = offset;

        let overlapping = snapshot.overlapping();
        let rows: Vec<ListItem> = if snapshot.rows.is_empty() {
            vec![ListItem::new("No slots: day_start must be before day_end")]
        } else {
            snapshot
                .rows
                .iter()
                .map(|row| {
                    let mut spans = vec![Span::styled(
                        format!("{} ", row.time),
                        Style::default().fg(Color::DarkGray),
                    )];
                    if row.starts.is_empty() {
                        match row.continues {
                            Some((_, task)) => spans.push(Span::styled(
                                format!("│ {}", truncate_text(&task.title, 40)),
                                Style::default().fg(Color::Blue),
                            )),
                            None => spans.push(Span::styled(
                                "·",
                                Style::default().fg(Color::DarkGray),
                            )),
                        }
                    }
                    for (n, (index, task)) in row.starts.iter().enumerate() {
                        if n > 0 {
                            spans.push(Span::raw("  "));
                        }
                        let clash = overlapping.contains(index);
                        spans.extend(slot_task_spans(task, &self.config, clash));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect()
        };
        let viewport = panels[1].height.saturating_sub(2) as usize;
        let slot = cursor.slot_index().min(snapshot.rows.len().saturating_sub(1));
        let offset = scroll_offset(slot, self.slot_offset, viewport, 2, snapshot.rows.len());
        let mut state = ListState::default();
        *state.offset_mut() = offset;
        if !snapshot.rows.is_empty() {
            state.select(Some(slot));
        }
        let mut title = format!("Timeline {}", date.format("%a %m-%d"));
        if !snapshot.off_grid.is_empty() {
            title.push_str(&format!(" ({} outside day)", snapshot.off_grid.len()));
        }
        let timeline = List::new(rows)
            .block(focused_block(title, !unscheduled_focus))
            .highlight_style(if unscheduled_focus {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                highlight_style()
            });
        f.render_stateful_widget(timeline, panels[1], &mut state);
        self.slot_offset = offset;
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            self.footer_help_line(),
            Line::from(vec![
                Span::styled("› ", Style::default().fg(Color::DarkGray)),
                Span::styled(self.status.clone(), Style::default().fg(Color::LightYellow)),
            ]),
        ];
        let footer = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .title(Span::styled(
                    " ? all keys ",
                    Style::default().fg(Color::DarkGray),
                ))
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(footer, area);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let keys: &[(&str, &str)] = match &self.view {
            View::Calendar => &[
                ("hjkl", "move"),
                ("b/n", "prev/next"),
                ("w/m", "week/month"),
                ("g", "today"),
                ("Enter/d", "day"),
                ("a", "add"),
                ("/", "search"),
                ("q", "quit"),
            ],
            View::Day(session) => match (session.mode, session.cursor.focus()) {
                (DayViewMode::List, _) => &[
                    ("j/k", "nav"),
                    ("J/K", "reorder"),
                    ("Space", "done"),
                    ("p/0-3", "priority"),
                    ("e", "edit"),
                    ("a", "add"),
                    ("d", "delete"),
                    ("[/]", "day"),
                    ("T", "timeline"),
                    ("Esc", "back"),
                ],
                (DayViewMode::Timeline, TimelineFocus::Unscheduled) => &[
                    ("Tab", "switch"),
                    ("j/k", "nav"),
                    ("s", "schedule"),
                    ("Enter", "assign"),
                    ("e", "edit"),
                    ("T", "list"),
                    ("Esc", "back"),
                ],
                (DayViewMode::Timeline, TimelineFocus::Timeline) => &[
                    ("Tab", "switch"),
                    ("j/k", "nav"),
                    ("J/K", "move"),
                    ("+/-", "duration"),
                    ("u", "unschedule"),
                    ("s", "reschedule"),
                    ("T", "list"),
                    ("Esc", "back"),
                ],
            },
        };
        let mut spans = Vec::new();
        for (key, label) in keys {
            spans.push(Span::styled(
                key.to_string(),
                Style::default().fg(Color::LightCyan),
            ));
            spans.push(Span::raw(format!(" {}  ", label)));
        }
        Line::from(spans)
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &TaskForm) {
        let mut lines = field_lines("Title", &form.title, form.field == FormField::Title);
        lines.extend(field_lines(
            "Notes",
            &form.description,
            form.field == FormField::Description,
        ));
        let picking = form.field == FormField::Priority;
        lines.push(Line::from(vec![
            Span::styled("Priority: ", label_style()),
            Span::styled(
                format!("◀ {} {} ▶", form.priority.label(), form.priority.icon()),
                Style::default().fg(if picking {
                    Color::Cyan
                } else {
                    priority_color(form.priority)
                }),
            ),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter save · Esc cancel · Tab next field · ←/→ priority · Ctrl+Enter new line",
            Style::default().fg(Color::DarkGray),
        )));
        let height = lines.len() as u16 + 4;
        let area = popup_area(f.size(), 70, height);
        let heading = format!("{} · {}", title, self.active_date().format("%a %d %b"));
        let dialog = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(dialog_block(heading, Color::Cyan));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, title: &str) {
        let area = popup_area(f.size(), 50, 8);
        let body = vec![
            Line::from(Span::styled(
                format!("\"{}\"", truncate_text(title, 40)),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("from {}", self.active_date().format("%A %d %B")),
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().fg(Color::LightRed)),
                Span::raw(" delete · "),
                Span::styled("n/Esc", Style::default().fg(Color::LightCyan)),
                Span::raw(" keep it"),
            ]),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(dialog_block("Delete task".to_string(), Color::LightRed));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, search: &SearchInput) {
        let area = popup_area(f.size(), 70, 16);
        let hits = self.store.search(&search.query.value);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("/ ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    search.query.with_caret(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
        ];
        if hits.is_empty() && !search.query.value.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                "No matches",
                Style::default().fg(Color::DarkGray),
            )));
        }
        let visible = usize::from(area.height.saturating_sub(5));
        let first = scroll_offset(search.selection, 0, visible, 0, hits.len());
        for (n, hit) in hits.iter().enumerate().skip(first).take(visible) {
            let mut line = Line::from(vec![
                Span::styled(
                    format!("{} ", hit.date.format("%Y-%m-%d")),
                    Style::default().fg(Color::LightYellow),
                ),
                Span::raw(truncate_text(&hit.task.title, 48)),
            ]);
            if n == search.selection {
                line.style = highlight_style();
            }
            lines.push(line);
        }
        let heading = format!("Search · {} found", hits.len());
        let dialog = Paragraph::new(lines).block(dialog_block(heading, Color::LightBlue));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_help(&self, f: &mut ratatui::Frame<'_>) {
        let sections: [(&str, &[(&str, &str)]); 4] = [
            (
                "Anywhere",
                &[("a", "new task"), ("/", "search"), ("?", "this help"), ("q", "quit")],
            ),
            (
                "Calendar",
                &[
                    ("hjkl", "move by day/week"),
                    ("b/n", "previous/next month or week"),
                    ("w/m", "week or month layout"),
                    ("Enter/d", "open the day"),
                ],
            ),
            (
                "Day list",
                &[
                    ("J/K", "reorder unscheduled"),
                    ("Space", "done"),
                    ("p 0-3", "priority"),
                    ("e d", "edit, delete"),
                    ("[ ]", "previous/next day"),
                    ("T", "timeline"),
                ],
            ),
            (
                "Timeline",
                &[
                    ("Tab", "switch panel"),
                    ("Enter", "place selected at cursor"),
                    ("s", "type a time"),
                    ("J/K", "move earlier/later"),
                    ("+/-", "longer/shorter"),
                    ("u", "unschedule"),
                ],
            ),
        ];
        let mut lines = Vec::new();
        for (heading, keys) in sections {
            lines.push(Line::from(Span::styled(
                heading,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            for (key, action) in keys {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<8}", key), Style::default().fg(Color::LightCyan)),
                    Span::raw(action.to_string()),
                ]));
            }
        }
        let area = popup_area(f.size(), 60, lines.len() as u16 + 2);
        let dialog = Paragraph::new(lines).block(dialog_block(
            "Keys · any key closes".to_string(),
            Color::LightGreen,
        ));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_quick_schedule(&self, f: &mut ratatui::Frame<'_>, pending: &QuickScheduleInput) {
        let area = popup_area(f.size(), 50, 11);
        let mut body = vec![
            Line::from(Span::styled(
                format!("Task: {}", pending.title),
                Style::default().fg(Color::White),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter time (HH:MM or HH:MM-HH:MM)",
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                "Default duration: 1 hour",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            Line::from(""),
            Line::from(Span::styled(
                pending.input.with_caret(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        if let Some(error) = &pending.error {
            body.push(Line::from(""));
            body.push(Line::from(Span::styled(
                error.clone(),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(dialog_block("Schedule Task".to_string(), Color::LightMagenta));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            title: FieldValue::new(""),
            description: FieldValue::new(""),
            priority: Priority::None,
            field: FormField::Title,
        }
    }

    fn from_task(task: &Task) -> Self {
        TaskForm {
            title: FieldValue::new(&task.title),
            description: FieldValue::new(&task.description),
            priority: task.priority,
            field: FormField::Title,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Priority,
            FormField::Priority => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Priority,
            FormField::Description => FormField::Title,
            FormField::Priority => FormField::Description,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title | FormField::Priority => &mut self.title,
            FormField::Description => &mut self.description,
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Box of `height` rows, `width_percent` of the screen wide, a third of the way down.
fn popup_area(area: Rect, width_percent: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_percent.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 3,
        width,
        height,
    }
}

fn dialog_block(title: String, color: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM)
}

fn focused_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(Span::styled(
            title,
            Style::default()
                .fg(if focused { Color::Cyan } else { Color::Gray })
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::LightCyan)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::LightRed,
        Priority::Medium => Color::Rgb(255, 184, 108),
        Priority::Low => Color::LightBlue,
        Priority::None => Color::White,
    }
}

fn prev_priority(priority: Priority) -> Priority {
    priority.cycle().cycle().cycle()
}

fn task_line(task: &Task, date: NaiveDate, today: NaiveDate) -> Line<'static> {
    let (check, style) = if task.complete {
        (
            "☑ ",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
        )
    } else if task.is_overdue(date, today) {
        (
            "⚠ ",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("☐ ", Style::default().fg(priority_color(task.priority)))
    };
    let mut spans = vec![Span::raw(check)];
    if let Some(range) = task.schedule {
        spans.push(Span::styled(
            format!("{} ", range),
            Style::default().fg(Color::LightYellow),
        ));
    }
    if task.priority != Priority::None && !task.complete {
        spans.push(Span::styled(
            format!("{} ", task.priority.icon()),
            Style::default().fg(priority_color(task.priority)),
        ));
    }
    spans.push(Span::styled(truncate_text(&task.title, 48), style));
    Line::from(spans)
}

fn slot_task_spans(task: &Task, config: &TimelineConfig, clash: bool) -> Vec<Span<'static>> {
    let Some(range) = task.schedule else {
        return Vec::new();
    };
    let marker = if grid::is_slot_aligned(config, range.start) {
        "▶"
    } else {
        "▷"
    };
    let style = if task.complete {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
            .fg(priority_color(task.priority))
            .add_modifier(Modifier::BOLD)
    };
    let mut spans = vec![
        Span::styled(format!("{} ", marker), Style::default().fg(Color::Cyan)),
        Span::styled(truncate_text(&task.title, 40), style),
        Span::styled(
            format!(" ({}, {})", range, format_duration(task.duration())),
            Style::default().fg(Color::Gray),
        ),
    ];
    if clash {
        spans.push(Span::styled(" overlap", Style::default().fg(Color::LightRed)));
    }
    spans
}

fn format_duration(duration: ChronoDuration) -> String {
    let minutes = duration.num_minutes();
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h{:02}m", h, m),
    }
}

/// First visible row keeping `selected` on screen with `margin` rows around it.
fn scroll_offset(selected: usize, offset: usize, viewport: usize, margin: usize, len: usize) -> usize {
    if viewport == 0 || len <= viewport {
        return 0;
    }
    let margin = margin.min((viewport - 1) / 2);
    let lowest = (selected + margin + 1).saturating_sub(viewport);
    let highest = selected.saturating_sub(margin);
    offset.clamp(lowest, highest).min(len - viewport)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn week_entry(task: &Task, date: NaiveDate, today: NaiveDate) -> Line<'static> {
    let time = task
        .start_time()
        .map(|start| start.to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let style = if task.complete {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if task.is_overdue(date, today) {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default().fg(priority_color(task.priority))
    };
    Line::from(vec![
        Span::styled(format!("{} ", time), Style::default().fg(Color::LightYellow)),
        Span::styled(truncate_text(&task.title, 24), style),
    ])
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(28)
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let prefix_style = label_style();
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    prefix_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeRange;
    use crate::storage::load_store;
    use ratatui::backend::TestBackend;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 18).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, keys: &str) {
        for ch in keys.chars() {
            app.handle_key(key(KeyCode::Char(ch))).unwrap();
        }
    }

    fn app_with(tasks: Vec<Task>) -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScheduleStore::new();
        for task in tasks {
            store.add(today(), task).unwrap();
        }
        let app = App::new(
            store,
            TimelineConfig::default(),
            DataLocation::in_dir(dir.path()),
            today(),
        );
        (app, dir)
    }

    fn render(app: &mut App) {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
    }

    fn session(app: &App) -> &DaySession {
        match &app.view {
            View::Day(session) => session,
            View::Calendar => panic!("not in day view"),
        }
    }

    #[test]
    fn day_view_starts_in_list_mode_and_esc_resets() {
        let (mut app, _dir) = app_with(vec![Task::new("a")]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(session(&app).mode, DayViewMode::List);
        press(&mut app, "T");
        app.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(session(&app).cursor.focus(), TimelineFocus::Timeline);
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(matches!(app.view, View::Calendar));
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(session(&app).mode, DayViewMode::List);
        assert_eq!(session(&app).cursor.focus(), TimelineFocus::Unscheduled);
    }

    #[test]
    fn enter_in_timeline_assigns_and_persists() {
        let (mut app, dir) = app_with(vec![Task::new("write"), Task::new("read")]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "T");
        app.handle_key(key(KeyCode::Tab)).unwrap();
        press(&mut app, "jj");
        app.handle_key(key(KeyCode::Tab)).unwrap();
        app.handle_key(key(KeyCode::Enter)).unwrap();

        let task = &app.store.tasks(today())[0];
        assert_eq!(
            task.schedule,
            Some(TimeRange::new("09:00".parse().unwrap(), "10:00".parse().unwrap()))
        );
        assert!(app.status.starts_with("Scheduled \"write\""));
        let saved = load_store(&dir.path().join("todos.json")).unwrap();
        assert_eq!(saved, app.store);
        render(&mut app);
    }

    #[test]
    fn quick_schedule_keeps_input_after_parse_error() {
        let (mut app, _dir) = app_with(vec![Task::new("write")]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "T");
        press(&mut app, "s");
        press(&mut app, "9am");
        app.handle_key(key(KeyCode::Enter)).unwrap();
        match &app.mode {
            Mode::QuickSchedule(pending) => {
                assert_eq!(pending.input.value, "9am");
                assert!(pending.error.is_some());
            }
            _ => panic!("quick schedule should stay open"),
        }
        render(&mut app);
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Backspace)).unwrap();
        }
        press(&mut app, "09:00-10:30");
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            app.store.tasks(today())[0].end_time(),
            Some("10:30".parse().unwrap())
        );
    }

    #[test]
    fn rejected_move_reports_specific_message() {
        let (mut app, _dir) = app_with(vec![Task::new("late").scheduled(TimeRange::new(
            "17:00".parse().unwrap(),
            "18:00".parse().unwrap(),
        ))]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "T");
        app.handle_key(key(KeyCode::Tab)).unwrap();
        for _ in 0..18 {
            press(&mut app, "j");
        }
        press(&mut app, "J");
        assert_eq!(app.status, "Cannot move later");
        press(&mut app, "K");
        assert_eq!(app.status, "Moved to 16:30-17:30");
        assert_eq!(session(&app).cursor.slot_index(), 17);
        press(&mut app, "-");
        assert_eq!(app.status, "Now ends at 17:00");
        press(&mut app, "-");
        assert_eq!(app.status, "Minimum duration reached");
        press(&mut app, "u");
        assert!(!app.store.tasks(today())[0].is_scheduled());
        press(&mut app, "u");
        assert_eq!(app.status, "Nothing scheduled at 16:30");
        render(&mut app);
    }

    #[test]
    fn add_and_delete_from_list_mode() {
        let (mut app, _dir) = app_with(vec![]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "a");
        press(&mut app, "plan week");
        render(&mut app);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.store.tasks(today()).len(), 1);

        press(&mut app, "d");
        render(&mut app);
        press(&mut app, "y");
        assert!(app.store.tasks(today()).is_empty());
        assert_eq!(session(&app).list_selection(), 0);
        render(&mut app);
    }

    #[test]
    fn space_toggles_selected_task_in_list_order() {
        let (mut app, _dir) = app_with(vec![
            Task::new("loose"),
            Task::new("fixed").scheduled(TimeRange::new(
                "08:00".parse().unwrap(),
                "09:00".parse().unwrap(),
            )),
        ]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, " ");
        assert!(app.store.tasks(today())[1].complete);
        assert!(!app.store.tasks(today())[0].complete);
    }

    #[test]
    fn calendar_month_navigation_clamps_day() {
        let (mut app, _dir) = app_with(vec![]);
        app.calendar_cursor = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        press(&mut app, "n");
        assert_eq!(app.calendar_cursor, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        press(&mut app, "b");
        press(&mut app, "b");
        assert_eq!(app.calendar_cursor, NaiveDate::from_ymd_opt(2025, 12, 28).unwrap());
        render(&mut app);
    }

    #[test]
    fn shift_j_reorders_unscheduled_tasks_only() {
        let (mut app, dir) = app_with(vec![
            Task::new("fixed").scheduled(TimeRange::new(
                "08:00".parse().unwrap(),
                "09:00".parse().unwrap(),
            )),
            Task::new("a"),
            Task::new("b"),
        ]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "jJ");
        let titles: Vec<&str> = app.store.tasks(today()).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["fixed", "b", "a"]);
        assert_eq!(session(&app).list_selection(), 2);
        assert_eq!(app.status, "Moved \"a\" down");
        assert_eq!(load_store(&dir.path().join("todos.json")).unwrap(), app.store);

        press(&mut app, "k");
        press(&mut app, "K");
        assert_eq!(app.status, "Scheduled tasks are ordered by start time");
        assert_eq!(app.store.tasks(today())[1].title, "b");
        assert_eq!(session(&app).list_selection(), 1);
    }

    #[test]
    fn search_jumps_to_the_matching_day() {
        let (mut app, _dir) = app_with(vec![Task::new("lunch")]);
        let later = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        app.store.add(later, Task::new("call mom")).unwrap();
        app.store.add(later, Task::new("Dentist")).unwrap();

        press(&mut app, "/");
        press(&mut app, "dent");
        render(&mut app);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(session(&app).date, later);
        assert_eq!(session(&app).mode, DayViewMode::List);
        assert_eq!(session(&app).list_selection(), 1);
        assert_eq!(app.calendar_cursor, later);

        press(&mut app, "/");
        press(&mut app, "nothing here");
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert!(matches!(app.mode, Mode::Search(_)));
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(session(&app).date, later);
    }

    #[test]
    fn digit_keys_set_priority() {
        let (mut app, _dir) = app_with(vec![Task::new("taxes")]);
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "3");
        assert_eq!(app.store.tasks(today())[0].priority, Priority::High);
        press(&mut app, "p");
        assert_eq!(app.store.tasks(today())[0].priority, Priority::None);
        press(&mut app, "1");
        assert_eq!(app.store.tasks(today())[0].priority, Priority::Low);
    }

    #[test]
    fn week_layout_steps_by_seven_days() {
        let (mut app, _dir) = app_with(vec![Task::new("sunday chores")]);
        press(&mut app, "w");
        assert!(app.calendar_layout == CalendarLayout::Week);
        render(&mut app);
        press(&mut app, "n");
        assert_eq!(app.calendar_cursor, NaiveDate::from_ymd_opt(2026, 1, 25).unwrap());
        assert_eq!(week_start(app.calendar_cursor), NaiveDate::from_ymd_opt(2026, 1, 19).unwrap());
        press(&mut app, "bb");
        assert_eq!(app.calendar_cursor, NaiveDate::from_ymd_opt(2026, 1, 11).unwrap());
        press(&mut app, "m");
        press(&mut app, "n");
        assert_eq!(app.calendar_cursor, NaiveDate::from_ymd_opt(2026, 2, 11).unwrap());
        press(&mut app, "d");
        assert_eq!(session(&app).date, NaiveDate::from_ymd_opt(2026, 2, 11).unwrap());
    }

    #[test]
    fn help_overlay_swallows_the_next_key() {
        let (mut app, _dir) = app_with(vec![]);
        press(&mut app, "?");
        assert!(matches!(app.mode, Mode::Help));
        render(&mut app);
        assert!(!app.handle_key(key(KeyCode::Char('q'))).unwrap());
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.handle_key(key(KeyCode::Char('q'))).unwrap());
    }

    #[test]
    fn move_between_slots_explains_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScheduleStore::new();
        store
            .add(
                today(),
                Task::new("call").scheduled(TimeRange::new(
                    "09:00".parse().unwrap(),
                    "10:00".parse().unwrap(),
                )),
            )
            .unwrap();
        let config = TimelineConfig {
            move_minutes: 15,
            ..TimelineConfig::default()
        };
        let mut app = App::new(store, config, DataLocation::in_dir(dir.path()), today());
        app.handle_key(key(KeyCode::Enter)).unwrap();
        press(&mut app, "T");
        app.handle_key(key(KeyCode::Tab)).unwrap();
        press(&mut app, "jjJ");
        assert!(app.status.starts_with("Moved to 09:15-10:15 (starts between slots"));
        assert_eq!(session(&app).cursor.slot_index(), 2);
        press(&mut app, "J");
        assert_eq!(app.status, "Nothing scheduled at 09:00");
    }

    #[test]
    fn scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(2, 0, 5, 1, 3), 0);
        assert_eq!(scroll_offset(9, 0, 5, 1, 20), 6);
        assert_eq!(scroll_offset(2, 6, 5, 1, 20), 1);
        assert_eq!(scroll_offset(19, 0, 5, 1, 20), 15);
        assert_eq!(scroll_offset(4, 3, 0, 1, 20), 0);
    }

    #[test]
    fn popups_are_centered_and_fit_the_screen() {
        let screen = Rect::new(0, 0, 100, 30);
        assert_eq!(popup_area(screen, 50, 9), Rect::new(25, 7, 50, 9));
        assert_eq!(popup_area(screen, 100, 60), Rect::new(0, 0, 100, 30));
    }

    #[test]
    fn durations_read_in_hours_and_minutes() {
        assert_eq!(format_duration(ChronoDuration::minutes(30)), "30m");
        assert_eq!(format_duration(ChronoDuration::minutes(120)), "2h");
        assert_eq!(format_duration(ChronoDuration::minutes(90)), "1h30m");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long title here", 8), "a lon...");
    }
}
