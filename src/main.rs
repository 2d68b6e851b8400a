// ==========================================
// 巡店路线校验系统 - 命令行入口
// ==========================================
// 用法:
//   route-validator validate <schedule|-> <visits> <from> <to> [start_week] [--save] [--out DIR]
//   route-validator upload-schedule <file>
//   route-validator history
//
// schedule 传 "-" 时使用已上传的排班；结果以 JSON 输出到 stdout
// ROUTE_VALIDATOR_LOG_FORMAT=json 时日志以 JSON 行输出到 stderr
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use route_validator::api::{export_report, ValidationRequest};
use route_validator::app::{get_default_db_path, AppState};
use route_validator::logging;
use serde_json::json;
use std::path::PathBuf;

const USAGE: &str = "用法:
  route-validator validate <schedule|-> <visits> <DD/MM/YYYY> <DD/MM/YYYY> [start_week] [--save] [--out DIR]
  route-validator upload-schedule <file>
  route-validator history";

/// validate 子命令参数
#[derive(Debug)]
struct ValidateArgs {
    schedule: Option<String>,
    visits: String,
    request: ValidationRequest,
    save: bool,
    out_dir: Option<PathBuf>,
}

fn parse_validate_args(args: &[String]) -> Result<ValidateArgs> {
    let mut positional = Vec::new();
    let mut save = false;
    let mut out_dir = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--save" => save = true,
            "--out" => {
                let dir = iter.next().ok_or_else(|| anyhow!("--out 需要目录参数"))?;
                out_dir = Some(PathBuf::from(dir));
            }
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() < 4 || positional.len() > 5 {
        bail!("validate 参数数量错误\n{}", USAGE);
    }

    let start_week = match positional.get(4) {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .with_context(|| format!("起始周次不是整数: {}", v))?,
        None => 1,
    };

    Ok(ValidateArgs {
        schedule: Some(positional[0].clone()).filter(|s| s != "-"),
        visits: positional[1].clone(),
        request: ValidationRequest {
            date_from: positional[2].clone(),
            date_to: positional[3].clone(),
            start_week,
        },
        save,
        out_dir,
    })
}

async fn run_validate(state: &AppState, args: ValidateArgs) -> Result<serde_json::Value> {
    let api = &state.validation_api;
    let report = api
        .validate_files(args.schedule.as_deref(), &args.visits, &args.request)
        .await?;

    let batch = if args.save {
        Some(api.save_batch(&report)?)
    } else {
        None
    };

    let exported = match &args.out_dir {
        Some(dir) => Some(export_report(&report, dir)?),
        None => None,
    };

    Ok(json!({
        "report": report,
        "batch": batch,
        "exported": exported,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    match std::env::var("ROUTE_VALIDATOR_LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");

    let db_path = get_default_db_path();
    tracing::info!(version = route_validator::VERSION, db = %db_path, "{}", route_validator::APP_NAME);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let output = match command {
        "validate" => run_validate(&state, parse_validate_args(&args[1..])?).await?,
        "upload-schedule" => {
            let file = args.get(1).ok_or_else(|| anyhow!("缺少排班文件\n{}", USAGE))?;
            let response = state.schedule_api.upload_schedule_file(file).await?;
            serde_json::to_value(response)?
        }
        "history" => serde_json::to_value(state.validation_api.history()?)?,
        _ => bail!("未知命令: {:?}\n{}", command, USAGE),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
