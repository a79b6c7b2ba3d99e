//! Connectivity check for the default model client
//! This is a utility binary, not part of the main application

use agent_workflow::config::GeminiConfig;
use agent_workflow::model::{GeminiClient, ModelClient};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking Gemini API access...\n");

    // Test 1: Check if API key is available
    println!("1. Checking for GEMINI_API_KEY environment variable...");
    let config = GeminiConfig::from_env();
    match &config.api_key {
        Some(key) => println!("   ✓ GEMINI_API_KEY is set (length: {} chars)", key.len()),
        None => {
            eprintln!("   ✗ GEMINI_API_KEY not found in environment");
            eprintln!("   Make sure to export it: export GEMINI_API_KEY=\"your-key\"");
            return Err("GEMINI_API_KEY not set".into());
        }
    }

    // Test 2: Build the client
    println!("\n2. Building client...");
    let client = GeminiClient::new(&config)?;
    println!("   ✓ Model: {}", client.model());
    println!("   ✓ Base URL: {}", config.base_url);

    // Test 3: Execute a query
    println!("\n3. Executing test query...");
    println!("   Query: 'What is 2+2? Answer in one sentence.'");

    let started = Instant::now();
    match client
        .generate_response("What is 2+2? Answer in one sentence.")
        .await
    {
        Ok(raw) => {
            let formatted = client.format_response(&raw);
            println!("   ✓ Response received in {} ms:", started.elapsed().as_millis());
            println!("   {}", formatted.text.trim());
            println!(
                "   Tokens: {} in / {} out",
                formatted.input_tokens, formatted.output_tokens
            );
        }
        Err(e) => {
            eprintln!("   ✗ Query failed: {}", e);
            eprintln!("\n   Troubleshooting:");
            eprintln!("   - Make sure GEMINI_API_KEY is valid: echo $GEMINI_API_KEY");
            eprintln!("   - Check GEMINI_MODEL and GEMINI_API_BASE_URL if you set them");
            return Err(e.into());
        }
    }

    println!("\n✓ All checks completed!");
    Ok(())
}
