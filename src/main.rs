use std::path::Path;

use anyhow::Result;

use correction_copies::models::{DocumentRef, InMemorySessionStore, Session, SessionStatus, SessionStore};
use correction_copies::orchestrator::{group_bundle, run_correction, CorrectionContext};
use correction_copies::services::AiIdentityExtractor;
use correction_copies::utils::logging;
use correction_copies::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <epreuve> <correction> <copies>", args[0]);
        eprintln!("  epreuve     sujet d'examen (PDF ou image)");
        eprintln!("  correction  correction de référence (PDF ou image)");
        eprintln!("  copies      lot scanné des copies d'élèves (PDF)");
        std::process::exit(2);
    }
    let (epreuve_path, correction_path, copies_path) = (&args[1], &args[2], &args[3]);

    let ctx = CorrectionContext::new(&config)?;
    let identity = AiIdentityExtractor::new(ctx.gateway.clone(), ctx.usage.clone());

    // Ingestion : découpage du lot de copies par élève
    let copies = group_bundle(Path::new(copies_path), &ctx.hybrid, &identity).await?;

    // Session prête à corriger
    let store = InMemorySessionStore::new();
    let mut session = Session::new("session-locale");
    session.epreuve = Some(DocumentRef {
        filename: file_name(epreuve_path),
        path: epreuve_path.clone(),
    });
    session.correction = Some(DocumentRef {
        filename: file_name(correction_path),
        path: correction_path.clone(),
    });
    session.copies = copies;
    session.status = SessionStatus::ReadyToCorrect;
    store.put(session)?;

    let mut session = store.get("session-locale")?;
    if session.is_corrected() {
        anyhow::bail!("la session est déjà corrigée, ses résultats sont figés");
    }

    let outcomes = run_correction(&session, &ctx).await?;

    session.results = Some(outcomes.clone());
    session.status = SessionStatus::Corrected;
    store.put(session)?;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
