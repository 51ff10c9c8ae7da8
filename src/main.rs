use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use sealkit::crypto::{
    self, KeyPairAlgorithm, KeyPairOptions, Protection, SecretKeyKind, SymmetricKey,
};
use sealkit::kdf::{Argon2Params, Kdf, ScryptParams};
use sealkit::{
    Algorithm, Encoding, ExpirySpec, HashOptions, Key, KeyFile, PayloadSource, SignOptions,
    TokenOptions, VerifyOptions,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use zeroize::Zeroizing;

mod auth;
mod logging;

const SECRET_ENV: &str = "SEALKIT_SECRET";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KdfChoice {
    Scrypt,
    Argon2id,
}

#[derive(Debug, clap::Args)]
struct KdfArgs {
    /// Key-derivation function
    #[arg(long, value_enum, default_value = "scrypt")]
    kdf: KdfChoice,

    /// Salt and derived key length in bytes
    #[arg(long, default_value_t = sealkit::hash::DEFAULT_LENGTH)]
    length: usize,

    /// scrypt cost as log2(N) (default: 14)
    #[arg(long = "scrypt-log-n")]
    scrypt_log_n: Option<u8>,

    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 1)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl KdfArgs {
    fn to_options(&self, encoding: Encoding) -> Result<HashOptions> {
        let kdf = match self.kdf {
            KdfChoice::Scrypt => {
                let default = ScryptParams::default();
                Kdf::Scrypt(ScryptParams::new(
                    self.scrypt_log_n.unwrap_or(default.log_n()),
                    default.r(),
                    default.p(),
                )?)
            }
            KdfChoice::Argon2id => {
                let default = Argon2Params::default();
                Kdf::Argon2id(Argon2Params::new(
                    self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
                    self.time_cost.unwrap_or(default.time_cost()),
                    self.parallelism.unwrap_or(default.parallelism()),
                )?)
            }
        };
        Ok(HashOptions {
            length: self.length,
            encoding,
            kdf,
        })
    }
}

#[derive(Debug, clap::Args)]
struct KeyArgs {
    /// PEM key file, or a file holding the raw secret for HMAC
    #[arg(long = "key", value_name = "PATH", env = "SEALKIT_KEY_FILE")]
    path: PathBuf,

    /// Passphrase for an encrypted private key
    #[arg(long, env = "SEALKIT_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Signature algorithm
    #[arg(long, default_value = "RSA-SHA256", value_parser = parse_algorithm)]
    algorithm: Algorithm,
}

impl KeyArgs {
    fn load(&self) -> Result<Key> {
        let text = KeyFile::public(&self.path).load()?;
        if self.algorithm == Algorithm::HmacSha256 {
            return Ok(Key::secret(text.trim_end().as_bytes().to_vec()));
        }
        Ok(match &self.passphrase {
            Some(passphrase) => Key::encrypted_pem(text.as_str(), passphrase.as_str()),
            None => Key::pem(text.as_str()),
        })
    }
}

fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
    s.parse().map_err(|e: sealkit::CryptError| e.to_string())
}

fn parse_encoding(s: &str) -> Result<Encoding, String> {
    s.parse().map_err(|e: sealkit::CryptError| e.to_string())
}

fn parse_expiry(s: &str) -> Result<ExpirySpec, String> {
    s.parse().map_err(|e: sealkit::CryptError| e.to_string())
}

#[derive(Debug, Parser)]
#[command(name = "sealkit")]
#[command(
    version,
    about = "Salted credential hashing, signatures and expiring bearer tokens."
)]
struct Cli {
    /// Encoding for every wire segment (hex, base64, base64url)
    #[arg(long, global = true, default_value = "hex", value_parser = parse_encoding, env = "SEALKIT_ENCODING")]
    encoding: Encoding,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hashes a secret read from SEALKIT_SECRET, stdin or a prompt
    Hash {
        #[command(flatten)]
        kdf: KdfArgs,
    },

    /// Checks a secret against a stored `salt:derivedKey` hash
    #[command(arg_required_else_help = true)]
    Compare {
        hash: String,
        #[command(flatten)]
        kdf: KdfArgs,
    },

    /// Generates a PEM key pair
    #[command(arg_required_else_help = true)]
    Keygen {
        /// Where to write the private key
        private_key: PathBuf,

        /// Where to write the public key (default: <PRIVATE_KEY>.pub)
        #[arg(long)]
        public_key: Option<PathBuf>,

        /// rsa or p256
        #[arg(long, default_value = "rsa")]
        kind: String,

        /// RSA modulus size
        #[arg(long, default_value_t = crypto::keygen::DEFAULT_RSA_BITS)]
        bits: usize,

        /// Encrypt the private key (passphrase from SEALKIT_PASSPHRASE or generated)
        #[arg(long, default_value_t = false)]
        encrypt: bool,

        #[arg(long, env = "SEALKIT_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Overwrite existing key files
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Prints a random HMAC or AES secret key
    SecretKey {
        /// hmac or aes
        #[arg(long, default_value = "hmac")]
        kind: String,

        /// Key length in bits (default: 256)
        #[arg(long)]
        bits: Option<usize>,
    },

    /// Signs a payload and prints `payload:signature`
    #[command(arg_required_else_help = true)]
    Sign {
        /// JSON value; anything that is not valid JSON is signed as a string
        payload: String,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Verifies a `payload:signature` message
    #[command(arg_required_else_help = true)]
    Verify {
        signed: String,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Creates and verifies bearer tokens
    #[command(subcommand)]
    Token(TokenCommands),

    /// Encrypts a payload with a symmetric key or an RSA public key
    #[command(arg_required_else_help = true)]
    Encrypt {
        payload: String,
        /// RSA public key file; without it, a symmetric key is used
        #[arg(long, value_name = "PATH")]
        public_key: Option<PathBuf>,
        /// Symmetric key text, at least 32 bytes
        #[arg(long = "secret-key", env = "SEALKIT_KEY", hide_env_values = true)]
        secret_key: Option<String>,
    },

    /// Decrypts output of `encrypt`
    #[command(arg_required_else_help = true)]
    Decrypt {
        ciphertext: String,
        /// RSA private key file; without it, a symmetric key is used
        #[arg(long, value_name = "PATH")]
        private_key: Option<PathBuf>,
        #[arg(long, env = "SEALKIT_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
        #[arg(long = "secret-key", env = "SEALKIT_KEY", hide_env_values = true)]
        secret_key: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum TokenCommands {
    /// Issues a token for a payload
    #[command(arg_required_else_help = true)]
    Create {
        payload: String,
        #[command(flatten)]
        key: KeyArgs,
        /// Seconds, shorthand like 24hrs / 30mns, or a date
        #[arg(long, value_parser = parse_expiry)]
        expires: Option<ExpirySpec>,
    },

    /// Verifies a token and prints the result as JSON
    #[command(arg_required_else_help = true)]
    Verify {
        token: String,
        #[command(flatten)]
        key: KeyArgs,
        /// Check the signature against this payload instead of the embedded one
        #[arg(long)]
        payload: Option<String>,
    },
}

/// A JSON argument, or the raw text as a JSON string.
fn payload_arg(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn symmetric_key(text: Option<String>) -> Result<SymmetricKey> {
    let text = match text {
        Some(text) => Zeroizing::new(text),
        None => auth::read_secret("SEALKIT_KEY", "Key: ")?,
    };
    Ok(SymmetricKey::from_text(&text)?)
}

fn verdict(ok: bool, yes: &str, no: &str) -> ExitCode {
    if ok {
        println!("{yes}");
        ExitCode::SUCCESS
    } else {
        println!("{no}");
        ExitCode::FAILURE
    }
}

fn write_key_pair(
    private_path: &Path,
    public_path: Option<PathBuf>,
    pair: &crypto::KeyPair,
    force: bool,
) -> Result<PathBuf> {
    let public_path = public_path.unwrap_or_else(|| {
        let mut name = private_path.as_os_str().to_owned();
        name.push(".pub");
        PathBuf::from(name)
    });
    let private_file = KeyFile::private(private_path);
    let public_file = KeyFile::public(&public_path);

    if !force {
        for file in [&private_file, &public_file] {
            if file.exists() {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    file.path().display()
                );
            }
        }
    }

    private_file
        .save(pair.private_key())
        .context("failed to write private key")?;
    public_file
        .save(pair.public_key())
        .context("failed to write public key")?;
    Ok(public_path)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let encoding = cli.encoding;
    match cli.command {
        Commands::Hash { kdf } => {
            let options = kdf.to_options(encoding)?;
            let secret = auth::read_new_secret(SECRET_ENV, "Secret: ")?;
            println!("{}", sealkit::hash(secret.as_bytes(), &options)?);
        }
        Commands::Compare { hash, kdf } => {
            let options = kdf.to_options(encoding)?;
            let secret = auth::read_secret(SECRET_ENV, "Secret: ")?;
            let matched = sealkit::compare(&hash, secret.as_bytes(), &options)?;
            return Ok(verdict(matched, "match", "no match"));
        }
        Commands::Keygen {
            private_key,
            public_key,
            kind,
            bits,
            encrypt,
            passphrase,
            force,
        } => {
            let algorithm = match kind.to_ascii_lowercase().as_str() {
                "rsa" => KeyPairAlgorithm::Rsa { bits },
                "p256" | "ec" | "ecdsa" => KeyPairAlgorithm::EcP256,
                other => bail!("unknown key kind '{other}' (expected rsa or p256)"),
            };
            let protection = match (encrypt, passphrase) {
                (false, _) => Protection::None,
                (true, Some(p)) => Protection::Passphrase(Zeroizing::new(p)),
                (true, None) => Protection::Generated,
            };
            let pair = crypto::generate_key_pair(&KeyPairOptions {
                algorithm,
                protection,
            })?;
            let public_path = write_key_pair(&private_key, public_key, &pair, force)?;

            println!("private key: {}", private_key.display());
            println!("public key: {}", public_path.display());
            if let (true, Some(passphrase)) = (encrypt, pair.passphrase()) {
                println!("passphrase: {passphrase}");
            }
        }
        Commands::SecretKey { kind, bits } => {
            let kind = match kind.to_ascii_lowercase().as_str() {
                "hmac" => SecretKeyKind::Hmac,
                "aes" => SecretKeyKind::Aes,
                other => bail!("unknown secret key kind '{other}' (expected hmac or aes)"),
            };
            println!("{}", crypto::generate_secret_key(kind, bits, encoding)?);
        }
        Commands::Sign { payload, key } => {
            let options = SignOptions {
                algorithm: key.algorithm,
                encoding,
            };
            let signed = sealkit::sign::sign_payload(&payload_arg(&payload), &key.load()?, options)?;
            println!("{}", signed.encode(encoding));
        }
        Commands::Verify { signed, key } => {
            let options = SignOptions {
                algorithm: key.algorithm,
                encoding,
            };
            let valid = sealkit::sign::verify_signed(&signed, &key.load()?, options)?;
            return Ok(verdict(valid, "verified", "not verified"));
        }
        Commands::Token(TokenCommands::Create {
            payload,
            key,
            expires,
        }) => {
            let options = TokenOptions {
                expiry: expires,
                algorithm: key.algorithm,
                encoding,
            };
            println!(
                "{}",
                sealkit::create_token(&payload_arg(&payload), &key.load()?, &options)?
            );
        }
        Commands::Token(TokenCommands::Verify {
            token,
            key,
            payload,
        }) => {
            let source = match payload {
                Some(p) => PayloadSource::detached(&payload_arg(&p))?,
                None => PayloadSource::Embedded,
            };
            let options = VerifyOptions {
                algorithm: key.algorithm,
                encoding,
                payload: source,
            };
            let result = sealkit::verify_token(&token, &key.load()?, &options)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Encrypt {
            payload,
            public_key,
            secret_key,
        } => {
            let payload = payload_arg(&payload);
            let sealed = match public_key {
                Some(path) => {
                    let pem = KeyFile::public(path).load()?;
                    crypto::public_encrypt(&payload, &Key::pem(pem.as_str()), encoding)?
                }
                None => crypto::symmetric_encrypt(&payload, &symmetric_key(secret_key)?, encoding)?,
            };
            println!("{sealed}");
        }
        Commands::Decrypt {
            ciphertext,
            private_key,
            passphrase,
            secret_key,
        } => {
            let opened = match private_key {
                Some(path) => {
                    let pem = KeyFile::private(path).load()?;
                    let key = match passphrase {
                        Some(p) => Key::encrypted_pem(pem.as_str(), p),
                        None => Key::pem(pem.as_str()),
                    };
                    let json = crypto::private_decrypt(&ciphertext, &key, encoding)?;
                    payload_arg(&json)
                }
                None => crypto::symmetric_decrypt(&ciphertext, &symmetric_key(secret_key)?, encoding)?,
            };
            match opened {
                Value::String(text) => println!("{text}"),
                other => println!("{other}"),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    logging::init();

    run(Cli::parse())
}
