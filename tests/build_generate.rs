// Tests for the build pass: config file in, generated robots file out
#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crawlgate::{
        BuildLifecycle, FileSystemAdapter, RobotsService,
        config::{RobotsConfig, loader::load_config, models::ServerConfig},
        core::{RuleItem, RuleSpecification},
    };
    use tempfile::TempDir;

    async fn service(config: &ServerConfig) -> RobotsService {
        let fs = Arc::new(FileSystemAdapter::new());
        RobotsService::initialize(RobotsConfig::from(config), fs.clone(), fs)
            .await
            .unwrap()
    }

    fn site(dir: &TempDir) -> ServerConfig {
        let root = dir.path().to_str().unwrap();
        ServerConfig::builder().root_dir(root).src_dir(root).build()
    }

    #[tokio::test]
    async fn test_generate_without_options_blocks_everything() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        let service = service(&config).await;

        service.on_before_build().await.unwrap();
        service.on_generate_done().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("dist/robots.txt")).unwrap();
        assert_eq!(written, "User-agent: *\nDisallow: /");
    }

    #[tokio::test]
    async fn test_generate_appends_rules_to_static_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(
            dir.path().join("static/robots.txt"),
            "User-agent: *\nDisallow: /private",
        )
        .unwrap();

        let mut config = site(&dir);
        config.robots = Some(RuleSpecification::List(vec![
            RuleItem::new()
                .with("user_agent", "Yandex")
                .with("Clean-Param", "ref /articles/"),
        ]));
        let service = service(&config).await;

        service.on_before_build().await.unwrap();
        assert_eq!(service.static_rules().len(), 2);
        let path = service.generate().await.unwrap();

        assert_eq!(path, dir.path().join("dist/robots.txt"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "User-agent: *\nDisallow: /private\nUser-agent: Yandex\nClean-param: ref /articles/"
        );
    }

    #[tokio::test]
    async fn test_generate_from_yaml_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let config_path = dir.path().join("crawlgate.yaml");
        std::fs::write(
            &config_path,
            format!(
                r#"
root_dir: "{root}"
src_dir: "{root}"
generate_dir: "public"
robots:
  - Disallow: "/admin"
  - Allow:
      - "/css"
      - "/js"
"#
            ),
        )
        .unwrap();

        let config = load_config(config_path.to_str().unwrap()).await.unwrap();
        let service = service(&config).await;
        service.on_before_build().await.unwrap();
        service.on_generate_done().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("public/robots.txt")).unwrap();
        assert_eq!(written, "Disallow: /admin\nAllow: /css\nAllow: /js");
    }

    #[tokio::test]
    async fn test_toml_mapping_is_merged_over_defaults() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let config_path = dir.path().join("crawlgate.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
root_dir = "{root}"
src_dir = "{root}"

[robots]
Disallow = "/checkout"
"#
            ),
        )
        .unwrap();

        let config = load_config(config_path.to_str().unwrap()).await.unwrap();
        let service = service(&config).await;
        assert_eq!(
            service.render_build().await.unwrap(),
            "User-agent: *\nDisallow: /checkout"
        );
    }
}
