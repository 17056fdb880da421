use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use danci_study_session::config::SessionConfig;
use danci_study_session::logging::init_tracing;
use danci_study_session::{
    CharacterSet, Collaborators, Direction, Session, SessionPreferences, SessionStart, StudyItem,
    StudySessionManager, VocabularyIndex,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = SessionConfig::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let vocabulary = match &config.vocabulary_path {
        Some(path) => match VocabularyIndex::load(path).await {
            Ok(index) => index,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to load vocabulary");
                std::process::exit(1);
            }
        },
        None => {
            tracing::error!("VOCABULARY_PATH is not set");
            std::process::exit(1);
        }
    };
    tracing::info!(entries = vocabulary.len(), "vocabulary loaded");

    let prefs = SessionPreferences::new(
        env_parse("STUDY_LEVEL").unwrap_or(1),
        std::env::var("STUDY_CHARACTER_SET")
            .map(|v| CharacterSet::parse(&v))
            .unwrap_or_default(),
        env_parse("STUDY_CARD_COUNT").unwrap_or(20),
    );

    let collaborators = Collaborators::from_config(&config);
    let manager = StudySessionManager::new(config, collaborators, Arc::new(vocabulary));

    let session = match manager.start_session(prefs.clone()).await {
        SessionStart::Ready(session) => session,
        SessionStart::NoCards => {
            println!("No vocabulary for level {}.", prefs.level);
            return;
        }
    };

    let offline: Vec<String> = session
        .health_probes()
        .iter()
        .filter(|probe| !probe.healthy)
        .map(|probe| probe.service.to_string())
        .collect();
    if !offline.is_empty() {
        println!("Offline: {} (studying with what is available).", offline.join(", "));
    }

    let session = match drive(session).await {
        Ok(session) => session,
        Err((session, err)) => {
            tracing::error!(error = %err, "stdin closed unexpectedly");
            session
        }
    };

    let stats = session.end_session().await;
    println!(
        "Reviewed {}/{} cards: {} correct, {} incorrect ({:.0}%).",
        stats.cards_reviewed,
        stats.total_cards,
        stats.correct_count,
        stats.incorrect_count,
        stats.accuracy() * 100.0
    );
}

async fn drive(mut session: Session) -> Result<Session, (Session, std::io::Error)> {
    let charset = session.preferences().character_set;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if let Some(item) = session.current() {
            let prompt = render(item, charset, session.position(), session.queue().len());
            if let Err(err) = stdout.write_all(prompt.as_bytes()).await {
                return Err((session, err));
            }
            let _ = stdout.flush().await;
        }

        let next = tokio::select! {
            next = lines.next_line() => next,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, ending session");
                return Ok(session);
            }
        };
        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(session),
            Err(err) => return Err((session, err)),
        };

        match line.trim() {
            "y" | "n" => {
                let is_correct = line.trim() == "y";
                match session.grade_current(is_correct).await {
                    Some(Err(err)) => println!("! {err}"),
                    Some(Ok(_)) | None => {}
                }
                session.navigate(Direction::Next);
            }
            "j" => {
                session.navigate(Direction::Next);
            }
            "k" => {
                session.navigate(Direction::Previous);
            }
            "r" => {
                let delivered = session.retry_pending().await;
                println!("{delivered} pending grade(s) delivered.");
            }
            "q" => return Ok(session),
            "" => {}
            other => println!("Unknown command {other:?}: y/n grade, j/k move, r retry, q quit."),
        }
    }
}

fn render(item: &StudyItem, charset: CharacterSet, position: usize, total: usize) -> String {
    format!(
        "[{}/{}] {}  {}  = {}\n> ",
        position + 1,
        total,
        item.display_text(charset),
        item.display_forms.pinyin,
        item.english.join("; ")
    )
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
