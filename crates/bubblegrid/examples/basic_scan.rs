use bubblegrid::{AnswerKey, Scanner};
use image::ImageReader;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <layout.json> <key.json> <sheet.png> [out.json]",
            args[0]
        );
        std::process::exit(2);
    }

    let key = AnswerKey::from_json_file(Path::new(&args[2]))?;
    let scanner = Scanner::from_layout_json_file(Path::new(&args[1]))?.with_answer_key(key);
    let image = ImageReader::open(&args[3])?.decode()?.to_luma8();

    let result = scanner.scan(&image)?;
    println!(
        "D:{} Y:{} B:{} Net:{:.2} id={}",
        result.correct_count,
        result.wrong_count,
        result.blank_count,
        result.net_score,
        result.student_id.as_deref().unwrap_or("-")
    );
    if result.suspicious {
        println!("suspicious: {}", result.suspicious_reasons.join(", "));
    }

    if let Some(out_path) = args.get(4) {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
