//! `fetchline get`: one tagged JSON request.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use fetchline_core::{IndicatorConfig, RequestSpec};

use crate::bootstrap::CliContext;
use crate::commands::GetArgs;
use crate::error::CliError;
use crate::presentation::SpinnerFactory;

/// Build the request described by `args`.
pub fn build_spec(args: &GetArgs) -> Result<RequestSpec, CliError> {
    let mut spec = match &args.json {
        Some(body) => {
            let value: serde_json::Value = serde_json::from_str(body)
                .map_err(|e| CliError::Arguments(format!("--json is not valid JSON: {e}")))?;
            RequestSpec::post(args.url.clone()).json(value)
        }
        None => RequestSpec::get(args.url.clone()),
    };
    spec = spec.tag(args.tag.clone());

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| CliError::Arguments(format!("header '{header}' is not 'Name: value'")))?;
        spec = spec.header(name.trim(), value.trim());
    }
    for pair in &args.query {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Arguments(format!("query '{pair}' is not 'name=value'")))?;
        spec = spec.query(name, value);
    }
    Ok(spec)
}

/// Execute the get command. Ctrl-C dismisses the indicator, which cancels
/// the request.
pub async fn execute(ctx: &CliContext, args: &GetArgs) -> Result<()> {
    let spec = build_spec(args)?;
    let indicator = if args.quiet {
        IndicatorConfig::none()
    } else {
        let label = format!("{} {}", spec.method.as_str(), spec.url);
        IndicatorConfig::new(Arc::new(SpinnerFactory::new(label))).with_cancelable(true)
    };
    let observer = ctx.http().observer_with_indicator(&spec, indicator);
    let lifecycle = CancellationToken::new();

    let request = ctx
        .http()
        .request_json_within::<serde_json::Value>(&spec, &observer, &lifecycle);
    tokio::pin!(request);

    let result = tokio::select! {
        result = &mut request => result,
        _ = tokio::signal::ctrl_c() => {
            observer.on_indicator_dismissed();
            lifecycle.cancel();
            request.await
        }
    };

    let value = result.map_err(CliError::from)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
