use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Reads a secret from `env_var`, then a piped stdin line, then a TTY prompt.
pub fn read_secret(env_var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    //  SEALKIT_SECRET="supersecret" sealkit hash
    if let Ok(secret) = std::env::var(env_var) {
        if !secret.is_empty() {
            return Ok(Zeroizing::new(secret));
        }
    }

    //  printf "%s" "$SECRET" | sealkit hash
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    } else {
        let secret = Zeroizing::new(rpassword::prompt_password(prompt)?);
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    bail!("no secret provided (set {env_var}, pipe it on stdin, or type it at the prompt)")
}

/// Like [`read_secret`], but asks twice on a TTY and requires both to match.
pub fn read_new_secret(env_var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if std::env::var_os(env_var).is_some() || !io::stdin().is_terminal() {
        return read_secret(env_var, prompt);
    }

    let first = Zeroizing::new(rpassword::prompt_password(prompt)?);
    let second = Zeroizing::new(rpassword::prompt_password("Confirm: ")?);

    if first.is_empty() {
        bail!("secret cannot be empty");
    }
    if first != second {
        bail!("secrets do not match");
    }

    Ok(first)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
