//! The `vault-ai` binary drives extraction and chat from the command line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use vault_extraction::citation::highlight;
use vault_extraction::extraction::{run_bulk, AbortToken, BulkReport, CellUpdate, DataContext};
use vault_extraction::store::DocumentStore;
use vault_extraction::types::{Document, ExtractionField, FieldType, ModelId};
use vault_provider::errors::ProviderError;
use vault_provider::message::ChatMessage;
use vault_provider::utils::history_turns;
use vault_provider::{
    ChatContext, Conversation, FsDocumentStore, ProviderConfig, SessionState, VaultProvider,
};

#[derive(Parser)]
#[command(name = "vault-ai", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Highlight a quote inside a source document
    Highlight {
        /// Document to search
        #[arg(long)]
        source: PathBuf,
        /// Quote to find
        #[arg(long)]
        quote: String,
    },
    /// Extract one field from each document (Ctrl-C stops before the next cell)
    Extract {
        /// Documents to read; repeatable
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        /// Field name
        #[arg(long)]
        field: String,
        /// Field type, e.g. short-text, date, number
        #[arg(long = "type", default_value = "short-text")]
        field_type: FieldType,
        /// What to extract; defaults to the field name
        #[arg(long)]
        instruction: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
    },
    /// Write or refine the instruction for a field
    Hint {
        /// Field name
        #[arg(long)]
        field: String,
        /// Field type
        #[arg(long = "type", default_value = "short-text")]
        field_type: FieldType,
        /// Draft instruction to refine
        #[arg(long)]
        draft: Option<String>,
    },
    /// Extract fields from documents, then answer questions from the table
    Ask {
        /// Question to answer; repeatable, later questions see earlier answers
        #[arg(long = "question", required = true)]
        questions: Vec<String>,
        /// Documents to read; repeatable
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        /// Short-text fields to extract first; repeatable
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
    },
    /// Send chat messages and stream each reply (Ctrl-C cancels)
    Chat {
        /// Message to send; repeatable, sent in order within one conversation
        #[arg(long = "message", required = true)]
        messages: Vec<String>,
        /// Project the conversation belongs to
        #[arg(long, default_value = "default")]
        project: String,
        /// Folder scoping the documents
        #[arg(long)]
        folder: Option<String>,
        /// Attached document ids; repeatable
        #[arg(long = "file-id")]
        file_ids: Vec<String>,
        /// Existing conversation to continue
        #[arg(long)]
        conversation: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), ProviderError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let provider = VaultProvider::new(ProviderConfig::from_env()?);

    match cli.command {
        Commands::Highlight { source, quote } => run_highlight(&source, &quote).await?,
        Commands::Extract {
            files,
            field,
            field_type,
            instruction,
            model,
        } => {
            let instruction = instruction.unwrap_or_else(|| format!("Extract the {field}."));
            let fields = vec![ExtractionField::new(&field, &field, field_type, instruction)];
            let documents = load_documents(&files).await?;
            let model = resolve_model(&provider, model);
            let report = run_extract(&provider, &documents, &fields, &model).await?;
            for cell in &report.cells {
                println!("{}", serde_json::to_string(cell).map_err(anyhow::Error::from)?);
            }
        }
        Commands::Hint {
            field,
            field_type,
            draft,
        } => {
            let engine = provider.engine()?;
            let hint = engine
                .generate_prompt_hint(&field, field_type, draft.as_deref())
                .await;
            println!("{hint}");
        }
        Commands::Ask {
            questions,
            files,
            fields,
            model,
        } => {
            let fields: Vec<ExtractionField> = fields
                .iter()
                .map(|name| {
                    ExtractionField::new(
                        name,
                        name,
                        FieldType::ShortText,
                        format!("Extract the {name}."),
                    )
                })
                .collect();
            let documents = load_documents(&files).await?;
            let model = resolve_model(&provider, model);
            let report = run_extract(&provider, &documents, &fields, &model).await?;
            let context = DataContext {
                documents,
                fields,
                results: report.results().cloned().collect(),
            };
            let engine = provider.engine()?;
            let mut history: Vec<ChatMessage> = Vec::with_capacity(questions.len() * 2);
            for question in questions {
                let answer = engine
                    .answer_data_question(&question, &context, &history_turns(&history), &model)
                    .await;
                println!("{answer}");

                let mut reply = ChatMessage::assistant();
                reply.append_text(&answer);
                history.push(ChatMessage::user(question));
                history.push(reply);
            }
        }
        Commands::Chat {
            messages,
            project,
            folder,
            file_ids,
            conversation,
        } => {
            let context = ChatContext {
                project_id: project,
                parent_folder_id: folder,
                file_ids,
                conversation_id: conversation,
            };
            run_chat(&provider, messages, context).await?;
        }
    }

    Ok(())
}

async fn run_highlight(source: &Path, quote: &str) -> Result<(), ProviderError> {
    let text = tokio::fs::read_to_string(source).await?;
    let result = highlight(&text, quote);
    if let Some(notice) = result.notice() {
        eprintln!("{notice}");
    } else {
        eprintln!("{} match(es)", result.match_count());
    }

    let rendered: String = result
        .segments
        .iter()
        .map(|s| {
            if s.is_match {
                format!("[[{}]]", s.text)
            } else {
                s.text.clone()
            }
        })
        .collect();
    println!("{rendered}");
    Ok(())
}

fn resolve_model(provider: &VaultProvider, model: Option<String>) -> ModelId {
    model.map_or_else(
        || provider.config().extraction.default_model.clone(),
        ModelId::new,
    )
}

async fn run_extract(
    provider: &VaultProvider,
    documents: &[Document],
    fields: &[ExtractionField],
    model: &ModelId,
) -> Result<BulkReport, ProviderError> {
    let engine = provider.engine()?;

    let abort = AbortToken::new();
    let on_ctrl_c = abort.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing the current cell...");
            on_ctrl_c.abort();
        }
    });

    let (tx, mut rx) = mpsc::channel::<CellUpdate>(provider.config().channel_capacity.max(1));
    let progress = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            tracing::info!(
                document = %update.document_id,
                field = %update.field_id,
                value = %update.display_value(),
                "cell done"
            );
        }
    });

    let report = run_bulk(&engine, documents, fields, model, &abort, Some(tx)).await;
    watcher.abort();
    progress.await.map_err(|e| ProviderError::Anyhow(e.into()))?;

    if report.aborted {
        tracing::warn!(cells = report.cells.len(), "extraction aborted");
    }
    Ok(report)
}

/// Loads each file through a store rooted at its parent directory.
async fn load_documents(files: &[PathBuf]) -> Result<Vec<Document>, ProviderError> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ProviderError::Config(format!("not a file path: {}", path.display())))?;
        documents.push(FsDocumentStore::new(parent).load(name).await?);
    }
    Ok(documents)
}

async fn run_chat(
    provider: &VaultProvider,
    messages: Vec<String>,
    context: ChatContext,
) -> Result<(), ProviderError> {
    let transport = provider.chat_transport()?;
    let mut conversation = Conversation::new();

    for message in messages {
        conversation.begin()?;
        let mut session = provider.session(Arc::clone(&transport));
        let mut snapshots = match session.start(message, context.clone()) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                conversation.abandon();
                return Err(e.into());
            }
        };

        let cancel = session.cancel_handle();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let mut shown = String::new();
        let mut stdout = std::io::stdout();
        while let Some(snapshot) = snapshots.next().await {
            let text = snapshot.message.text();
            match text.strip_prefix(shown.as_str()) {
                Some(delta) => print!("{delta}"),
                None => print!("\n{text}"),
            }
            stdout.flush()?;
            shown = text;
        }
        println!();
        watcher.abort();

        let exchange = session.finish().await?;
        if let Some(detail) = &exchange.assistant.error {
            tracing::warn!(error = %detail, "Chat failed");
        }
        for tool in exchange.assistant.tool_invocations() {
            tracing::info!(tool = %tool.tool_name, state = ?tool.state.stage(), "Tool call");
        }
        let state = exchange.state;
        conversation.record(exchange);
        tracing::info!(state = ?state, messages = conversation.messages().len(), "Chat finished");

        if state != SessionState::Completed {
            break;
        }
    }
    Ok(())
}
