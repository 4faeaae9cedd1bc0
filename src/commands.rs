use crate::cursor::TimelineCursor;
use crate::grid;
use crate::model::{Config, Priority, Task};
use crate::scheduler::SchedulingController;
use crate::storage::{load_config, load_store, save_store, DataLocation};
use crate::store::ScheduleStore;
use crate::ui;
use crate::view::DaySnapshot;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

pub fn add(
    location: &DataLocation,
    title: String,
    date: Option<NaiveDate>,
    desc: Option<String>,
    priority: Priority,
) -> Result<()> {
    let mut store = load_store(&location.todos)?;
    let date = date.unwrap_or_else(today);
    let task = Task::new(title)
        .with_description(desc.unwrap_or_default())
        .with_priority(priority);
    let index = store
        .add(date, task)
        .with_context(|| format!("adding task to {}", date))?;
    save_store(&location.todos, &store)?;
    println!("Added task {} on {}", index, date);
    Ok(())
}

pub fn list(location: &DataLocation, date: Option<NaiveDate>) -> Result<()> {
    let store = load_store(&location.todos)?;
    let config = load_config(&location.config)?;
    let date = date.unwrap_or_else(today);
    let snapshot = DaySnapshot::build(&store, date, &config.timeline);
    println!("{}", date.format("%A %Y-%m-%d"));
    if snapshot.list_entries().is_empty() {
        println!("  (no tasks)");
    }
    for (index, task) in snapshot.list_entries() {
        print_task(index, task);
    }
    let stats = store.stats_for(date, today());
    println!(
        "\n{} total, {} done, {} overdue",
        stats.total, stats.completed, stats.overdue
    );
    Ok(())
}

pub fn schedule(
    location: &DataLocation,
    index: usize,
    time: String,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut store = load_store(&location.todos)?;
    let config = load_config(&location.config)?;
    let date = date.unwrap_or_else(today);
    let mut cursor = TimelineCursor::new();
    let placed = SchedulingController::new(&mut store, &config.timeline, &mut cursor, date)
        .quick_schedule(index, &time)
        .with_context(|| format!("scheduling task {} on {}", index, date))?;
    save_store(&location.todos, &store)?;
    println!("Scheduled task {} at {}", placed.index, placed.range);
    Ok(())
}

pub fn unschedule(location: &DataLocation, index: usize, date: Option<NaiveDate>) -> Result<()> {
    let mut store = load_store(&location.todos)?;
    let date = date.unwrap_or_else(today);
    let previous = store
        .unschedule(date, index)
        .with_context(|| format!("unscheduling task {} on {}", index, date))?;
    match previous {
        Some(range) => {
            save_store(&location.todos, &store)?;
            println!("Unscheduled task {} (was {})", index, range);
        }
        None => println!("Task {} was not scheduled", index),
    }
    Ok(())
}

pub fn done(location: &DataLocation, index: usize, date: Option<NaiveDate>) -> Result<()> {
    let mut store = load_store(&location.todos)?;
    let date = date.unwrap_or_else(today);
    let complete = store
        .toggle_complete(date, index)
        .with_context(|| format!("updating task {} on {}", index, date))?;
    save_store(&location.todos, &store)?;
    println!(
        "Marked task {} as {}",
        index,
        if complete { "done" } else { "open" }
    );
    Ok(())
}

pub fn search(location: &DataLocation, query: String) -> Result<()> {
    let store = load_store(&location.todos)?;
    let hits = store.search(&query);
    if hits.is_empty() {
        println!("No tasks match {:?}", query);
    }
    for hit in hits {
        print!("{} ", hit.date);
        print_task(hit.index, hit.task);
    }
    Ok(())
}

pub fn config(location: &DataLocation) -> Result<()> {
    let Config { timeline } = load_config(&location.config)?;
    println!("config: {}", location.config.display());
    println!("tasks:  {}", location.todos.display());
    println!("log:    {}", location.log.display());
    println!(
        "day {} - {}, {} minute slots ({} slots), moves of {} minutes",
        timeline.day_start,
        timeline.day_end,
        timeline.slot_minutes,
        grid::total_slots(&timeline),
        timeline.move_minutes
    );
    Ok(())
}

pub fn tui(location: &DataLocation) -> Result<()> {
    let store: ScheduleStore = load_store(&location.todos)?;
    let config = load_config(&location.config)?;
    ui::run(store, config.timeline, location.clone())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_task(index: usize, task: &Task) {
    let check = if task.complete { "[x]" } else { "[ ]" };
    let when = task
        .schedule
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unscheduled".to_string());
    let mut line = format!("  {:>2} {} {:<11} {}", index, check, when, task.title);
    if task.priority != Priority::None {
        line.push_str(&format!(" {}", task.priority.icon()));
    }
    println!("{}", line);
    if !task.description.is_empty() {
        println!("       {}", task.description);
    }
}
