//! Reply text rendering.
//!
//! Every function returns plain newline-terminated text. None of them
//! append the prompt; the connection handler does that after every
//! non-quit reply. Times are passed in so output is deterministic under test.

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use unisenac_core::{format_duration, ServerStats, SessionView};

/// Name reported by `status`
pub const SYSTEM_NAME: &str = "TECH UNISENAC - Versão Básica";

/// Host used by `ping` when none is given
pub const DEFAULT_PING_HOST: &str = "google.com";

/// Banner sent once on accept.
pub fn welcome(session: &SessionView) -> String {
    let time = session.connected_at.format("%H:%M:%S");
    format!(
        "\n\
+================================================+\n\
|            *** BEM-VINDO(A)! ***               |\n\
+================================================+\n\
|  Usuario: {username:<15}                       |\n\
|  Conectado as: {time:<10}              |\n\
|                                                |\n\
|  TECH UNISENAC SERVER - VERSÃO BÁSICA          |\n\
|                                                |\n\
|  COMANDOS DISPONÍVEIS:                         |\n\
|  > help    - Lista de comandos                 |\n\
|  > status  - Status do servidor                |\n\
|  > users   - Usuários conectados               |\n\
|  > ping    - Teste de conectividade            |\n\
|  > time    - Data e hora                       |\n\
|  > quit    - Sair                              |\n\
+================================================+\n\
\n\
Digite 'help' para ver todos os comandos disponíveis.\n\
\n",
        username = session.username,
        time = time.to_string(),
    )
}

pub fn help() -> String {
    "\n\
[HELP] COMANDOS DISPONÍVEIS\n\
\n\
COMANDOS BÁSICOS:\n\
* help     - Esta lista de comandos\n\
* status   - Status do servidor\n\
* users    - Lista usuários conectados\n\
* ping     - Teste de conectividade\n\
* time     - Data e hora atual\n\
* whoami   - Suas informações\n\
* uptime   - Tempo de atividade do servidor\n\
* quit     - Sair do servidor\n\
\n"
    .to_string()
}

pub fn status(stats: &ServerStats, now: DateTime<Local>) -> String {
    format!(
        "\n\
[STATUS] SERVIDOR\n\
Sistema: {SYSTEM_NAME}\n\
Status: OPERACIONAL\n\
Uptime: {uptime}\n\
Usuários Conectados: {users}\n\
Conexões Totais: {total}\n\
Comandos Executados: {commands}\n\
\n",
        uptime = format_duration(stats.uptime(now)),
        users = stats.active_sessions,
        total = stats.total_connections,
        commands = stats.commands_executed,
    )
}

/// Lists sessions in the order given (the registry returns accept order).
pub fn users(sessions: &[SessionView], now: DateTime<Local>) -> String {
    if sessions.is_empty() {
        return "[USERS] Nenhum usuário conectado.\n\n".to_string();
    }

    let mut out = String::from("[USERS] USUÁRIOS CONECTADOS\n\n");
    for (i, session) in sessions.iter().enumerate() {
        let _ = writeln!(
            out,
            "{n}. {username} - {ip} - {duration} - {commands} cmds",
            n = i + 1,
            username = session.username,
            ip = session.id.ip(),
            duration = format_duration(session.connected_for(now)),
            commands = session.commands_count,
        );
    }
    let _ = write!(out, "\nTotal: {} usuários\n\n", sessions.len());
    out
}

pub fn ping(host: Option<&str>, latency_ms: u32) -> String {
    format!(
        "\n\
[PING] TESTE DE CONECTIVIDADE\n\
Host: {host}\n\
Latência: {latency_ms}ms\n\
Status: OK\n\
\n",
        host = host.unwrap_or(DEFAULT_PING_HOST),
    )
}

pub fn time(now: DateTime<Local>) -> String {
    format!(
        "\n\
[TIME] DATA E HORA\n\
Data: {date}\n\
Hora: {time}\n\
\n",
        date = now.format("%d/%m/%Y"),
        time = now.format("%H:%M:%S"),
    )
}

pub fn whoami(session: &SessionView, now: DateTime<Local>) -> String {
    format!(
        "\n\
[WHOAMI] SUAS INFORMAÇÕES\n\
Usuário: {username}\n\
IP: {addr}\n\
Conectado há: {duration}\n\
Comandos executados: {commands}\n\
\n",
        username = session.username,
        addr = session.id,
        duration = format_duration(session.connected_for(now)),
        commands = session.commands_count,
    )
}

pub fn uptime(stats: &ServerStats, now: DateTime<Local>) -> String {
    format!(
        "[UPTIME] Servidor ativo há: {}\n\n",
        format_duration(stats.uptime(now))
    )
}

/// Reply to an unknown keyword. The connection stays open.
pub fn unrecognized(keyword: &str) -> String {
    format!("Comando '{keyword}' não reconhecido. Digite 'help' para ver comandos disponíveis.\n\n")
}

/// Reply when producing a response failed. The connection stays open.
pub fn error(message: &str) -> String {
    format!("[ERRO] {message}\n\n")
}

/// Final message before the server closes a quitting session.
pub fn goodbye(session: &SessionView, now: DateTime<Local>) -> String {
    format!(
        "\n\
+================================================+\n\
|                 ATE LOGO!                      |\n\
+================================================+\n\
|  Obrigado por usar o Tech UniSenac Server!     |\n\
|                                                |\n\
|  Usuário: {username:<15}                       |\n\
|  Tempo conectado: {duration:<20}         |\n\
|  Comandos executados: {commands:<10}               |\n\
+================================================+\n\
\n\
Desconectando...\n",
        username = session.username,
        duration = format_duration(session.connected_for(now)),
        commands = session.commands_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use unisenac_core::SessionId;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn session(username: &str, port: u16, commands: u64) -> SessionView {
        SessionView {
            id: SessionId::new(format!("192.168.0.10:{port}").parse().unwrap()),
            username: username.to_string(),
            connected_at: fixed_now() - chrono::Duration::seconds(65),
            commands_count: commands,
        }
    }

    fn stats() -> ServerStats {
        ServerStats {
            started_at: fixed_now() - chrono::Duration::seconds(3_700),
            total_connections: 4,
            commands_executed: 12,
            active_sessions: 2,
        }
    }

    #[test]
    fn test_help_lists_all_commands() {
        let text = help();
        for keyword in ["help", "status", "users", "ping", "time", "whoami", "uptime"] {
            assert!(text.contains(keyword), "help is missing {keyword}");
        }
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_welcome_names_user() {
        let text = welcome(&session("user_3", 5000, 0));
        assert!(text.contains("user_3"));
        assert!(text.contains("14:04:02"));
        assert!(text.contains("help"));
    }

    #[test]
    fn test_status_reports_counters() {
        let text = status(&stats(), fixed_now());
        assert!(text.contains("OPERACIONAL"));
        assert!(text.contains("Uptime: 1h 1m 40s"));
        assert!(text.contains("Usuários Conectados: 2"));
        assert!(text.contains("Conexões Totais: 4"));
        assert!(text.contains("Comandos Executados: 12"));
    }

    #[test]
    fn test_users_empty() {
        assert!(users(&[], fixed_now()).contains("Nenhum usuário conectado"));
    }

    #[test]
    fn test_users_lists_in_order() {
        let sessions = vec![session("user_1", 5000, 2), session("user_2", 5001, 0)];
        let text = users(&sessions, fixed_now());
        assert!(text.contains("1. user_1 - 192.168.0.10 - 1m 5s - 2 cmds"));
        assert!(text.contains("2. user_2 - 192.168.0.10 - 1m 5s - 0 cmds"));
        assert!(text.contains("Total: 2 usuários"));
    }

    #[test]
    fn test_ping_default_host() {
        let text = ping(None, 42);
        assert!(text.contains("Host: google.com"));
        assert!(text.contains("Latência: 42ms"));

        let text = ping(Some("example.org"), 10);
        assert!(text.contains("Host: example.org"));
    }

    #[test]
    fn test_time_format() {
        let text = time(fixed_now());
        assert!(text.contains("Data: 09/03/2024"));
        assert!(text.contains("Hora: 14:05:07"));
    }

    #[test]
    fn test_whoami_shows_address() {
        let text = whoami(&session("user_9", 6000, 5), fixed_now());
        assert!(text.contains("Usuário: user_9"));
        assert!(text.contains("IP: 192.168.0.10:6000"));
        assert!(text.contains("Comandos executados: 5"));
    }

    #[test]
    fn test_uptime() {
        assert_eq!(
            uptime(&stats(), fixed_now()),
            "[UPTIME] Servidor ativo há: 1h 1m 40s\n\n"
        );
    }

    #[test]
    fn test_unrecognized_names_keyword() {
        let text = unrecognized("foobar");
        assert!(text.contains("'foobar'"));
        assert!(text.contains("não reconhecido"));
    }

    #[test]
    fn test_error_line() {
        assert_eq!(error("boom"), "[ERRO] boom\n\n");
    }

    #[test]
    fn test_goodbye_summarises_session() {
        let text = goodbye(&session("user_2", 5001, 7), fixed_now());
        assert!(text.contains("ATE LOGO!"));
        assert!(text.contains("user_2"));
        assert!(text.contains("1m 5s"));
        assert!(text.contains("7"));
        assert!(text.ends_with("Desconectando...\n"));
        assert!(!text.contains(crate::PROMPT));
    }
}
