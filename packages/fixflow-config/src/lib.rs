mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Postgres, Providers, Search, Service, Storage,
	StorageBackend, Trending,
};

use std::{fs, path::Path};

/// Hard ceiling for `search.max_limit`.
pub const SEARCH_LIMIT_CEILING: u32 = 20;

pub const EMBEDDING_PROVIDER_IDS: [&str; 3] = ["placeholder", "local", "remote"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "service.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if let Some(origin) = cfg
		.service
		.cors_allowed_origins
		.iter()
		.find(|origin| !origin.starts_with("http://") && !origin.starts_with("https://"))
	{
		return Err(Error::Validation {
			message: format!(
				"service.cors_allowed_origins entry {origin:?} must start with http:// or https://."
			),
		});
	}
	if cfg.storage.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.vector_dim must be greater than zero.".to_string(),
		});
	}

	match (cfg.storage.backend, cfg.storage.postgres.as_ref()) {
		(StorageBackend::Postgres, None) => {
			return Err(Error::Validation {
				message: "storage.postgres is required when storage.backend is postgres."
					.to_string(),
			});
		},
		(StorageBackend::Postgres, Some(postgres)) => {
			if postgres.dsn.trim().is_empty() {
				return Err(Error::Validation {
					message: "storage.postgres.dsn must be non-empty.".to_string(),
				});
			}
			if postgres.pool_max_conns == 0 {
				return Err(Error::Validation {
					message: "storage.postgres.pool_max_conns must be greater than zero."
						.to_string(),
				});
			}
		},
		(StorageBackend::Ephemeral, _) => {},
	}

	let embedding = &cfg.providers.embedding;

	if !EMBEDDING_PROVIDER_IDS.contains(&embedding.provider_id.as_str()) {
		return Err(Error::Validation {
			message: "providers.embedding.provider_id must be one of placeholder, local, or remote."
				.to_string(),
		});
	}
	if embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if embedding.dimensions != cfg.storage.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.vector_dim.".to_string(),
		});
	}
	if embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if embedding.provider_id == "remote" {
		for (label, value) in [("api_base", &embedding.api_base), ("api_key", &embedding.api_key)]
		{
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!(
						"providers.embedding.{label} must be non-empty for the remote provider."
					),
				});
			}
		}
	}
	if embedding.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: "providers.embedding.default_headers values must be strings.".to_string(),
		});
	}

	for (label, default_limit, max_limit) in [
		("search", cfg.search.default_limit, cfg.search.max_limit),
		("trending", cfg.trending.default_limit, cfg.trending.max_limit),
	] {
		if default_limit == 0 {
			return Err(Error::Validation {
				message: format!("{label}.default_limit must be greater than zero."),
			});
		}
		if default_limit > max_limit {
			return Err(Error::Validation {
				message: format!("{label}.default_limit must not exceed {label}.max_limit."),
			});
		}
	}

	if cfg.search.max_limit > SEARCH_LIMIT_CEILING {
		return Err(Error::Validation {
			message: format!("search.max_limit must be {SEARCH_LIMIT_CEILING} or less."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.embedding.provider_id = cfg.providers.embedding.provider_id.trim().to_string();

	if cfg.providers.embedding.cache_dir.as_deref().is_some_and(|dir| dir.trim().is_empty()) {
		cfg.providers.embedding.cache_dir = None;
	}

	cfg.service.cors_allowed_origins = cfg
		.service
		.cors_allowed_origins
		.iter()
		.map(|origin| origin.trim().trim_end_matches('/').to_string())
		.filter(|origin| !origin.is_empty())
		.collect();
}
