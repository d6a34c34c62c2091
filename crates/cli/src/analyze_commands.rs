//! `saju analyze`: one dispatch from the terminal, same path as `POST /analyze`.

use std::{sync::Arc, time::Duration};

use {
    anyhow::bail,
    clap::Args,
    saju_agents::DispatchResult,
    saju_config::SajuConfig,
    saju_gateway::{
        NotifierHandle, build_dispatcher,
        prompt::{BirthInfo, DatePart, Language, build_prompt, today_kst},
    },
    tokio_util::sync::CancellationToken,
    tracing::info,
};

#[derive(Args)]
pub struct AnalyzeArgs {
    #[arg(long)]
    year: String,
    #[arg(long)]
    month: String,
    #[arg(long)]
    day: String,
    /// Birth time; omitted means unknown.
    #[arg(long)]
    time: Option<String>,
    /// Reply language: ko, en, ja or zh.
    #[arg(long, default_value = "ko")]
    language: String,
    /// Print the prompt instead of calling the backend.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

pub async fn handle_analyze(config: &SajuConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let info = BirthInfo::new(
        &DatePart::Text(args.year),
        &DatePart::Text(args.month),
        &DatePart::Text(args.day),
        args.time.as_deref(),
    )?;
    let language = Language::from_code(&args.language);
    let prompt = build_prompt(&info, language, today_kst());

    if args.dry_run {
        println!("{prompt}");
        return Ok(());
    }

    let notifier = NotifierHandle::from_config(&config.notify);
    let dispatcher = build_dispatcher(config, Arc::clone(&notifier.notifier));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = dispatcher.dispatch(&prompt, &cancel).await;
    drop(dispatcher);
    notifier
        .drain(Duration::from_secs(config.notify.timeout_secs.max(1) + 1))
        .await;

    match result {
        DispatchResult::Success {
            text,
            credential,
            model,
            attempts,
        } => {
            info!(credential, model = %model, attempts, "reading generated");
            println!("{text}");
            Ok(())
        },
        DispatchResult::Failure {
            last_error,
            attempts,
        } => bail!(
            "no reading after {attempts} attempt(s) [{}]: {last_error}",
            last_error.kind()
        ),
    }
}
