//! DDL post-processing.
//!
//! The server hands back `SHOW CREATE ...` bodies verbatim; these helpers
//! rewrite them into replayable dump sections: charset save/restore wraps,
//! version-guarded view definitions, `DELIMITER` bracketing for bodies that
//! contain `;`, and DEFINER stripping.

use std::sync::OnceLock;

use regex::Regex;

use crate::column::ColumnDescriptor;
use crate::error::{DumpError, Result};

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn view_anchor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^(CREATE(?:\s+ALGORITHM=(?:UNDEFINED|MERGE|TEMPTABLE))?)\s+(?:(DEFINER=`[^`]*`@`[^`]*`(?:\s+SQL\s+SECURITY\s+(?:DEFINER|INVOKER))?)\s+)?(VIEW\s.+)$",
        )
        .expect("static view anchor regex")
    })
}

fn auto_increment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"AUTO_INCREMENT=\d+ ?").expect("static auto_increment regex"))
}

fn definer_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s+DEFINER\s*=\s*(?:`[^`]*`|'[^']*'|[^\s@]+)@(?:`[^`]*`|'[^']*'|\S+)")
            .expect("static definer regex")
    })
}

/// Wrap a `CREATE TABLE` body in the client-charset save/restore pair,
/// optionally stripping the `AUTO_INCREMENT=n` table option.
pub fn wrap_create_table(ddl: &str, charset: &str, reset_auto_increment: bool) -> String {
    let body = if reset_auto_increment {
        auto_increment().replace_all(ddl, "").into_owned()
    } else {
        ddl.to_string()
    };
    format!(
        "/*!40101 SET @saved_cs_client     = @@character_set_client */;\n\
         /*!40101 SET character_set_client = {charset} */;\n\
         {body};\n\
         /*!40101 SET character_set_client = @saved_cs_client */;\n"
    )
}

/// Build the stand-in table emitted ahead of a view's real definition.
pub fn view_standin(view: &str, columns: &[ColumnDescriptor]) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("  {} {}", quote_ident(&c.name), c.raw_sql))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
        quote_ident(view),
        cols
    )
}

/// Rewrite a `CREATE VIEW` body into its version-guarded dump form.
///
/// The body must match the canonical
/// `CREATE [ALGORITHM=...] [DEFINER=...] VIEW ...` shape; anything else is
/// an unexpected server reply.
pub fn rewrite_create_view(ddl: &str, skip_definer: bool) -> Result<String> {
    let caps = view_anchor().captures(ddl.trim()).ok_or_else(|| {
        DumpError::UnexpectedReply(format!("unparseable CREATE VIEW statement: {}", ddl))
    })?;

    let create = caps.get(1).map(|m| m.as_str()).unwrap_or("CREATE");
    let definer = caps.get(2).map(|m| m.as_str());
    let view = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

    let mut out = format!("/*!50001 {create} */\n");
    if let (Some(definer), false) = (definer, skip_definer) {
        out.push_str(&format!("/*!50013 {definer} */\n"));
    }
    out.push_str(&format!("/*!50001 {view} */;\n"));
    Ok(out)
}

/// Remove a `DEFINER=user@host` clause from a trigger/routine/event body.
pub fn strip_definer(ddl: &str) -> String {
    definer_clause().replace_all(ddl, "").into_owned()
}

/// Bracket a trigger body with `DELIMITER` directives.
pub fn trigger_section(name: &str, ddl: &str, add_drop: bool, skip_definer: bool) -> String {
    let body = if skip_definer {
        strip_definer(ddl)
    } else {
        ddl.to_string()
    };
    let mut out = String::new();
    if add_drop {
        out.push_str(&format!("DROP TRIGGER IF EXISTS {};\n", quote_ident(name)));
    }
    out.push_str(&format!("DELIMITER ;;\n{body};;\nDELIMITER ;\n"));
    out
}

/// Emit a stored procedure with its drop guard and charset save/restore.
pub fn procedure_section(name: &str, ddl: &str, charset: &str, skip_definer: bool) -> String {
    let body = if skip_definer {
        strip_definer(ddl)
    } else {
        ddl.to_string()
    };
    format!(
        "/*!50003 DROP PROCEDURE IF EXISTS {} */;\n\
         /*!50003 SET @saved_cs_client      = @@character_set_client */;\n\
         /*!50003 SET character_set_client  = {charset} */;\n\
         DELIMITER ;;\n\
         {body};;\n\
         DELIMITER ;\n\
         /*!50003 SET character_set_client  = @saved_cs_client */;\n",
        quote_ident(name)
    )
}

/// Emit a scheduled event inside its time zone / charset / sql_mode
/// save-and-restore envelope.
pub fn event_section(ddl: &str, charset: &str, skip_definer: bool) -> String {
    let body = if skip_definer {
        strip_definer(ddl)
    } else {
        ddl.to_string()
    };
    format!(
        "/*!50106 SET @save_time_zone       = @@TIME_ZONE */;\n\
         /*!50003 SET @saved_cs_client      = @@character_set_client */;\n\
         /*!50003 SET @saved_cs_results     = @@character_set_results */;\n\
         /*!50003 SET @saved_col_connection = @@collation_connection */;\n\
         /*!50003 SET character_set_client  = {charset} */;\n\
         /*!50003 SET character_set_results = {charset} */;\n\
         /*!50003 SET collation_connection  = {charset}_general_ci */;\n\
         /*!50003 SET @saved_sql_mode       = @@sql_mode */;\n\
         /*!50003 SET sql_mode              = '' */;\n\
         DELIMITER ;;\n\
         {body};;\n\
         DELIMITER ;\n\
         /*!50003 SET sql_mode              = @saved_sql_mode */;\n\
         /*!50003 SET character_set_client  = @saved_cs_client */;\n\
         /*!50003 SET character_set_results = @saved_cs_results */;\n\
         /*!50003 SET collation_connection  = @saved_col_connection */;\n\
         /*!50106 SET TIME_ZONE             = @save_time_zone */;\n"
    )
}
