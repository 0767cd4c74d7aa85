use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use amc8_trainer::app::{App, AppScreen};
use amc8_trainer::config::Config;
use amc8_trainer::engine::advice::StudyRecommendation;
use amc8_trainer::engine::question::{self, Question};
use amc8_trainer::engine::scoring;
use amc8_trainer::engine::topic::{Difficulty, Topic};
use amc8_trainer::event::{AppEvent, EventHandler};
use amc8_trainer::session::mistake_retry::RetryState;
use amc8_trainer::session::mock_exam::{MockPhase, format_clock};

const TREND_POINTS: usize = 20;

#[derive(Parser)]
#[command(name = "amc8", version, about = "AMC 8 competition math trainer")]
struct Cli {
    #[arg(short, long, help = "Directory for saved progress")]
    data_dir: Option<String>,

    #[arg(short, long, help = "Question and advice provider (local, gemini)")]
    provider: Option<String>,

    #[arg(long, help = "Skip simulated latency")]
    instant: bool,

    #[arg(long, help = "Write the effective config file and exit")]
    write_config: bool,
}

/// What the terminal has already shown, so polling only prints changes.
#[derive(Default)]
struct View {
    quiz_ticket: Option<u64>,
    mock_phase: Option<MockPhase>,
    low_time_warned: bool,
    advice_seen: Option<StudyRecommendation>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable config: {e}");
        Config::default()
    });
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    if cli.instant {
        config.question_latency_ms = 0;
        config.mock_latency_ms = 0;
        config.analysis_latency_ms = 0;
    }
    config.validate();

    if cli.write_config {
        config.save()?;
        println!("Config written.");
        return Ok(());
    }

    let mut app = App::new(config)?;
    let events = EventHandler::new(Duration::from_secs(1));
    let mut view = View {
        advice_seen: app.stats.study_advice.clone(),
        ..View::default()
    };

    print_banner(&app);
    loop {
        match events.next()? {
            AppEvent::Line(line) => handle_line(&mut app, &mut view, line.trim()),
            AppEvent::Tick => app.tick(),
            AppEvent::Eof => app.should_quit = true,
        }
        app.poll();
        render_updates(&app, &mut view);

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_line(app: &mut App, view: &mut View, line: &str) {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return;
    };
    let args: Vec<&str> = words.collect();

    match command.to_ascii_lowercase().as_str() {
        "help" | "?" => print_help(),
        "quit" | "q" => app.should_quit = true,
        "menu" => {
            app.go_to_menu();
            print_banner(app);
        }
        "practice" | "p" => {
            let topic = args
                .first()
                .and_then(|k| Topic::from_key(k))
                .unwrap_or(Topic::Mixed);
            let difficulty = args
                .get(1)
                .and_then(|k| Difficulty::from_key(k))
                .unwrap_or(Difficulty::Competition);
            println!("Practice: {topic}, {difficulty}. Loading...");
            app.start_quiz(topic, difficulty);
        }
        "diagnostic" => {
            println!("Diagnostic: one Medium question per topic. Loading...");
            app.start_diagnostic();
        }
        "hint" | "h" => match &app.quiz {
            Some(quiz) => {
                println!("Hint: {}", quiz.question.hint);
                app.show_hint();
            }
            None => println!("No question on screen."),
        },
        "submit" | "s" | "submit!" => submit(app, view, command.ends_with('!')),
        "next" | "n" => {
            if app.screen == AppScreen::Diagnostic
                && !app.quiz.as_ref().is_some_and(|q| q.is_submitted())
            {
                println!("Answer this one first.");
                return;
            }
            app.next_question();
            if app.screen == AppScreen::Menu {
                println!("Diagnostic finished. Your study plan is on its way.");
                print_banner(app);
            }
        }
        "mock" => {
            if app.mock.phase() != MockPhase::NotStarted {
                println!("A mock exam is already open. Use `menu` to abandon it.");
                return;
            }
            println!("Generating a 25-question mock exam...");
            app.start_mock();
        }
        "show" => match parse_index(args.first()) {
            Some(i) => match app.mock.questions().get(i) {
                Some(q) => print_question(q, i + 1, app.mock.answers().get(&q.id).copied()),
                None => println!("No question {}.", i + 1),
            },
            None => println!("Usage: show <number>"),
        },
        "answer" => {
            let index = parse_index(args.first());
            let option = args
                .get(1)
                .and_then(|s| s.chars().next())
                .and_then(question::option_index);
            match (index, option) {
                (Some(i), Some(o)) if app.mock_answer(i, o) => {
                    println!(
                        "Recorded {} for question {}. {}/{} answered.",
                        question::option_label(o),
                        i + 1,
                        app.mock.answered_count(),
                        app.mock.questions().len()
                    );
                }
                _ => println!("Usage (during a mock exam): answer <number> <A-E>"),
            }
        }
        "time" => println!("Time left: {}", app.mock.clock()),
        "review" => print_review(app),
        "exit" => {
            if app.exit_mock() {
                println!("Left the review.");
                print_banner(app);
            } else {
                println!("Nothing to exit; submit the exam first.");
            }
        }
        "stats" => print_stats(app),
        "advice" => match &app.stats.study_advice {
            Some(advice) => print_advice(advice),
            None if app.is_analyzing() => println!("Analyzing your progress..."),
            None => println!("Finish the diagnostic or a mock exam to unlock a study plan."),
        },
        "mistakes" => print_mistakes(app),
        "retry" => match args.first() {
            Some(id) if app.retry_mistake(id) => {
                if let Some(retry) = &app.retry {
                    print_question(&retry.question, 0, None);
                }
            }
            _ => println!("Usage: retry <mistake id> (see `mistakes`)"),
        },
        "reveal" => {
            app.reveal_retry();
            if let Some(retry) = &app.retry {
                print_solution(&retry.question);
            }
        }
        "again" => {
            app.reset_retry();
            println!("Pick an answer.");
        }
        "remove" => match args.first() {
            Some(id) if app.remove_mistake(id) => println!("Removed {id} from the mistake log."),
            _ => println!("Usage: remove <mistake id>"),
        },
        "reset" => {
            if args.first() == Some(&"confirm") {
                app.reset_data();
                *view = View::default();
                println!("All progress erased.");
            } else {
                println!("This erases all progress. Type `reset confirm` to proceed.");
            }
        }
        other => {
            let letter = other.chars().next().filter(|_| other.len() == 1);
            match letter.and_then(question::option_index) {
                Some(option) if app.select_option(option) => {
                    println!("Selected {}. `submit` to lock it in.", question::option_label(option));
                }
                Some(_) => println!("No question accepting answers right now."),
                None => println!("Unknown command {other:?}. Type `help`."),
            }
        }
    }
}

fn submit(app: &mut App, view: &mut View, confirmed: bool) {
    match app.screen {
        AppScreen::Quiz | AppScreen::Diagnostic => {
            let Some(correct) = app.submit_answer() else {
                println!("Select an answer first (A-E).");
                return;
            };
            if let Some(quiz) = &app.quiz {
                if correct {
                    println!("Correct! Streak {}.", app.stats.streak);
                } else {
                    println!("Not quite.");
                }
                print_solution(&quiz.question);
            }
            println!("XP {} (level {}). `next` for another.", app.stats.xp, app.stats.level);
        }
        AppScreen::MockExam => {
            let unanswered = app.mock.unanswered_count();
            if unanswered > 0 && !confirmed {
                println!("{unanswered} questions unanswered. `submit!` to submit anyway.");
                return;
            }
            if app.submit_mock() {
                view.mock_phase = Some(MockPhase::Submitted);
                print_review(app);
            }
        }
        AppScreen::MistakeRetry => match app.submit_retry() {
            Some(RetryState::Correct) => println!("Correct! `remove <id>` to clear it from the log."),
            Some(RetryState::Incorrect) => println!("Still not right. `again` or `reveal`."),
            Some(RetryState::Idle) => println!("Select an answer first (A-E)."),
            Some(RetryState::Revealed) => println!("Solution already shown."),
            None => {}
        },
        _ => println!("Nothing to submit."),
    }
}

fn parse_index(arg: Option<&&str>) -> Option<usize> {
    arg.and_then(|s| s.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
}

fn render_updates(app: &App, view: &mut View) {
    if let Some(quiz) = &app.quiz
        && view.quiz_ticket != app.quiz_ticket()
    {
        view.quiz_ticket = app.quiz_ticket();
        if let Some(run) = &app.diagnostic {
            let (n, total) = run.position();
            println!("Diagnostic question {n} of {total}");
        }
        print_question(&quiz.question, 0, None);
    }

    let phase = app.mock.phase();
    if view.mock_phase != Some(phase) {
        if phase == MockPhase::InProgress {
            println!(
                "Mock exam started: {} questions, {}. `show <n>`, `answer <n> <A-E>`, `submit`.",
                app.mock.questions().len(),
                format_clock(app.mock.remaining_secs())
            );
            view.low_time_warned = false;
        }
        view.mock_phase = Some(phase);
    }
    if phase == MockPhase::InProgress && app.mock.is_low_time() && !view.low_time_warned {
        println!("Under five minutes left ({}).", app.mock.clock());
        view.low_time_warned = true;
    }

    if app.stats.study_advice.is_some() && app.stats.study_advice != view.advice_seen {
        view.advice_seen = app.stats.study_advice.clone();
        println!("Your study plan has been updated. Type `advice` to see it.");
    }
}

fn print_banner(app: &App) {
    println!(
        "AMC 8 Trainer | level {} | {} XP | streak {}",
        app.stats.level, app.stats.xp, app.stats.streak
    );
    if !app.stats.diagnostic_completed {
        println!("New here? Start with `diagnostic`.");
    }
    println!("Type `help` for commands.");
}

fn print_help() {
    println!(
        "\
practice [topic] [difficulty]  topics: mixed algebra geometry number_theory counting logic
                               difficulties: easy medium hard any
diagnostic                     five-question placement run
A-E, submit, hint, next        answer the question on screen
mock                           timed 25-question exam
show <n>, answer <n> <A-E>     during a mock exam; `time` shows the clock
submit / submit!               finish the exam (`!` skips the unanswered check)
review, exit                   after a mock exam
stats, advice                  progress dashboard and study plan
mistakes, retry <id>           revisit missed problems; `reveal`, `again`
remove <id>                    drop a problem from the mistake log
reset confirm                  erase all progress
menu, quit"
    );
}

fn print_question(q: &Question, number: usize, selected: Option<usize>) {
    println!();
    if number > 0 {
        println!("Question {number} [{} | {}]", q.topic, q.difficulty);
    } else {
        println!("[{} | {} | {}]", q.id, q.topic, q.difficulty);
    }
    println!("{}", q.problem_text);
    for (i, option) in q.options.iter().enumerate() {
        let marker = if selected == Some(i) { '*' } else { ' ' };
        println!(" {marker}({}) {option}", question::option_label(i));
    }
}

fn print_solution(q: &Question) {
    if let Some(answer) = q.correct_option() {
        println!(
            "Answer: ({}) {answer}",
            question::option_label(q.correct_option_index)
        );
    }
    println!("{}", q.explanation);
}

fn print_review(app: &App) {
    let Some(review) = app.mock.review() else {
        println!("No submitted exam to review.");
        return;
    };
    println!(
        "Score: {}/{} ({}%)",
        review.correct_count,
        review.total,
        scoring::accuracy_percent(review.correct_count as u32, review.total as u32)
    );
    for (i, outcome) in review.outcomes.iter().enumerate() {
        let picked = outcome
            .selected
            .map(|s| question::option_label(s).to_string())
            .unwrap_or_else(|| "-".to_string());
        let mark = if outcome.correct { "ok" } else { "x" };
        println!(
            "{:>2}. {mark:<2} you {picked}, answer {}",
            i + 1,
            question::option_label(outcome.correct_option)
        );
    }
    println!("`exit` to return to the menu.");
}

fn print_stats(app: &App) {
    let stats = &app.stats;
    println!(
        "Level {} | {} XP ({} to next) | streak {}",
        stats.level,
        stats.xp,
        scoring::xp_to_next_level(stats.xp),
        stats.streak
    );
    println!(
        "Solved {}/{} ({}% accuracy)",
        stats.correct,
        stats.total,
        scoring::accuracy_percent(stats.correct, stats.total)
    );
    for (topic, score) in stats.mastery_by_topic.iter() {
        println!("  {:<24} {score:>3}%", topic.name());
    }
    let trend = stats.accuracy_trend(TREND_POINTS);
    if !trend.is_empty() {
        let points: Vec<String> = trend.iter().map(u32::to_string).collect();
        println!("Recent accuracy trend: {}", points.join(" "));
    }
}

fn print_advice(advice: &StudyRecommendation) {
    let names = |topics: &[Topic]| {
        topics
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("Focus on: {}", names(&advice.focus_areas));
    if !advice.strength_areas.is_empty() {
        println!("Strengths: {}", names(&advice.strength_areas));
    }
    println!("{}", advice.advice);
    println!("Next milestone: {}", advice.next_milestone);
}

fn print_mistakes(app: &App) {
    if app.stats.mistakes.is_empty() {
        println!("No mistakes logged.");
        return;
    }
    for q in &app.stats.mistakes {
        let preview: String = q.problem_text.chars().take(60).collect();
        println!("{:<12} [{}] {preview}", q.id, q.topic);
    }
}
