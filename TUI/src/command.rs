use crate::action::Action;

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Result<Action, String> {
        let input = input.trim();
        if !input.starts_with('/') {
            return Err("Not a command".to_string());
        }

        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        let args = args.trim();

        match cmd {
            "/help" => Ok(Action::Help),
            "/clear" => Ok(Action::ClearHistory),
            "/upload" => {
                if args.is_empty() {
                    Err("Usage: /upload <path> [path...]\n  Example: /upload ./notes.txt ./paper.pdf".to_string())
                } else {
                    let paths = args.split_whitespace().map(str::to_string).collect();
                    Ok(Action::Upload { paths })
                }
            }
            "/retrieve" => Ok(Action::Retrieve { cid: args.to_string() }),
            "/backup" => Ok(Action::Backup),
            "/search" => {
                if args.is_empty() {
                    Err("Usage: /search <query>\n  Example: /search vector databases".to_string())
                } else {
                    Ok(Action::Search { query: args.to_string() })
                }
            }
            "/send" => Ok(Action::SendToChat),
            "/attest" => Ok(Action::Attestation),
            "/config" => Ok(Action::ShowConfig),
            "/template" => {
                if args.is_empty() {
                    Err("Usage: /template <blog|email|social|article>".to_string())
                } else {
                    Ok(Action::Template { name: args.to_string() })
                }
            }
            "/health" => Ok(Action::Health),
            "/quit" => Ok(Action::Quit),
            _ => Err(format!("Unknown command: {}. Type /help for available commands.", cmd)),
        }
    }
}
