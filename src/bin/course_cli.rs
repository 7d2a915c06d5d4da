use std::{path::PathBuf, sync::Arc};

use ai_course::{
    ai_utils::LlmClient,
    client::{GenerationClient, HttpFunctions, Notification, NotificationKind, Notifications},
    config::Config,
    course::{CourseLevel, GeneratedCourse, repository::CourseRepository},
    db,
    generator::{CourseGenerator, GenerateCourseRequest},
    progress::{ProgressTracker, SqliteProgressStore},
    search::YouTubeSearch,
    user::{create_user, get_user_info},
    utils::init_log,
};
use clap::Parser;

#[derive(Debug, clap::Parser)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, default_value = "database/course.db")]
    database: PathBuf,
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Generate a course locally, optionally saving it for a user
    Generate {
        title: String,
        #[arg(short, long, default_value = "beginner")]
        level: CourseLevel,
        #[arg(short, long)]
        save_for: Option<i64>,
    },
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    Login {
        id: i64,
        #[command(subcommand)]
        command: LoginCommand,
    },
    /// Generate through a running server
    Remote {
        #[arg(short, long, default_value = "http://127.0.0.1:8080")]
        server: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        title: String,
        #[arg(short, long, default_value = "beginner")]
        level: CourseLevel,
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, clap::Subcommand)]
enum UserCommand {
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Info {
        id: i64,
    },
}

#[derive(Debug, clap::Subcommand)]
enum LoginCommand {
    ListCourses,
    Complete {
        course_id: String,
        module: u32,
        chapter: u32,
        #[arg(short, long, default_value = "0")]
        minutes: u32,
    },
    Incomplete {
        course_id: String,
        module: u32,
        chapter: u32,
    },
    Summary {
        course_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_log(None)?;
    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let Args {
        command,
        database,
        config,
    } = args;
    let config = Config::load(config.as_deref())?;
    match command {
        Commands::Remote {
            server,
            email,
            password,
            title,
            level,
            save,
        } => remote(server, email, password, title, level, save).await?,
        Commands::Generate {
            title,
            level,
            save_for,
        } => {
            let http = reqwest::Client::new();
            let generator = CourseGenerator::new(
                LlmClient::new(&config.ai),
                YouTubeSearch::new(http, config.search.clone()),
                config.generation.clone(),
            );
            let course = generator
                .generate_course(GenerateCourseRequest {
                    title,
                    level: Some(level),
                })
                .await?;
            print_course(&course);
            if let Some(user_id) = save_for {
                let database = db::connect(&database).await?;
                let saved = CourseRepository::new(database).insert(user_id, &course).await?;
                println!("Saved as course {}", saved.id);
            }
        }
        Commands::User { command } => {
            let database = db::connect(&database).await?;
            match command {
                UserCommand::Create {
                    name,
                    email,
                    password,
                } => {
                    let id = create_user(&database, name, email, password).await?;
                    println!("User created with id: {}", id);
                }
                UserCommand::Info { id } => {
                    println!("{:#?}", get_user_info(&database, id).await?);
                }
            }
        }
        Commands::Login { id, command } => {
            let database = db::connect(&database).await?;
            let store = SqliteProgressStore::new(database.clone());
            let mut tracker = ProgressTracker::load(Some(id.to_string()), store)
                .await
                .with_shape(config.progress);
            match command {
                LoginCommand::ListCourses => {
                    for course in CourseRepository::new(database).list_for_user(id).await? {
                        println!(
                            "{:<8} {:<14} {}",
                            course.id, course.course.level, course.course.title
                        );
                    }
                }
                LoginCommand::Complete {
                    course_id,
                    module,
                    chapter,
                    minutes,
                } => {
                    tracker
                        .mark_chapter_complete(&course_id, module, chapter, minutes)
                        .await;
                    println!("{:#?}", tracker.chapter_progress(&course_id, module, chapter));
                }
                LoginCommand::Incomplete {
                    course_id,
                    module,
                    chapter,
                } => {
                    tracker
                        .mark_chapter_incomplete(&course_id, module, chapter)
                        .await;
                    println!("{:#?}", tracker.chapter_progress(&course_id, module, chapter));
                }
                LoginCommand::Summary { course_id } => {
                    println!("{:#?}", tracker.summary(&course_id, config.progress));
                }
            }
        }
    }
    Ok(())
}

async fn remote(
    server: String,
    email: String,
    password: String,
    title: String,
    level: CourseLevel,
    save: bool,
) -> anyhow::Result<()> {
    let functions = Arc::new(HttpFunctions::new(server)?);
    let user = functions.sign_in(&email, &password).await?;
    let client = GenerationClient::new(functions, Notifications::default());
    client.set_user(Some(user.id));

    let result = client.generate(&title, level).await;
    print_notifications(client.take_notifications());
    let course = result?;
    print_course(&course);
    if save {
        let saved = client.save().await;
        print_notifications(client.take_notifications());
        println!("Saved as course {}", saved?.id);
    }
    Ok(())
}

fn print_notifications(notifications: Vec<Notification>) {
    for n in notifications {
        let tag = match n.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        println!("[{}] {}: {}", tag, n.title, n.description);
    }
}

fn print_course(course: &GeneratedCourse) {
    println!("# {} ({})\n\n{}\n", course.title, course.level, course.description);
    for (i, module) in course.content.modules.iter().enumerate() {
        println!("## Module {}: {}", i + 1, module.title);
        for (j, lesson) in module.lessons.iter().enumerate() {
            println!("   {}.{} {}", i + 1, j + 1, lesson.title);
        }
    }
    println!("\nGlossary:");
    for item in &course.glossary {
        println!("  {}: {}", item.term, item.definition);
    }
    println!("\nRoadmap:");
    for stage in &course.roadmap {
        println!("  {} ({} milestones)", stage.stage, stage.milestones.len());
    }
    for video in &course.resources.videos {
        println!("Video: {} {}", video.title, video.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_reach_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("course.db");
        let database = database.to_str().unwrap();

        let args = Args::try_parse_from(["course_cli", "-d", database, "user", "info", "42"]).unwrap();
        assert!(run(args).await.is_err());

        let args = Args::try_parse_from([
            "course_cli", "-d", database, "user", "create", "-n", "Ada", "-e", "ada@x.io", "-p", "pw",
        ])
        .unwrap();
        run(args).await.unwrap();
        let args = Args::try_parse_from(["course_cli", "-d", database, "user", "info", "1"]).unwrap();
        run(args).await.unwrap();
    }
}
