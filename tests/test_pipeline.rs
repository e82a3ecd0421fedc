mod common;

use image::{GenericImageView, ImageFormat};
use patch_upscaler::app::Message;
use patch_upscaler::config::DownloadPolicy;
use patch_upscaler::job::{self, JobEvent, UpscaleRequest};
use patch_upscaler::source::is_well_formed;
use patch_upscaler::{export, App, AppConfig, CancellationToken, ImageSource, ModelInfo, TilingOptions};
use iced::Application;

#[test]
fn file_to_upscaled_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::write_png(dir.path(), "input.png", 33, 17);

    let source = ImageSource::from_path(&input).unwrap();
    assert!(is_well_formed(source.data_url()));
    assert_eq!(source.origin(), Some(input.as_path()));

    let request = UpscaleRequest {
        id: 7,
        source,
        model: ModelInfo::find("Lanczos-4x").unwrap(),
        tiling: TilingOptions { patch_size: 10, padding: 3 },
        models_dir: dir.path().join("models"),
    };

    let mut patches = Vec::new();
    let mut finished = None;
    job::execute(&request, &CancellationToken::new(), &mut |event| match event {
        JobEvent::Patches(batch) => patches.extend(batch.iter().map(|p| (p.row, p.col))),
        JobEvent::Finished(result) => finished = Some(result),
        JobEvent::Started { .. } => {}
    });

    assert_eq!(patches.len(), 8);
    assert_eq!(patches.first(), Some(&(0, 0)));
    assert_eq!(patches.last(), Some(&(1, 3)));

    let upscaled = finished.expect("finished event").expect("upscale succeeded");
    assert_eq!(upscaled.dimensions(), (132, 68));
    assert!(upscaled.data_url().starts_with("data:image/png;base64,"));

    let saved = export::save_image(&upscaled, &dir.path().join(export::default_file_name())).unwrap();
    let reopened = image::open(&saved).unwrap();
    assert_eq!(reopened.dimensions(), (132, 68));
}

#[test]
fn jpeg_input_keeps_its_mime_type() {
    let jpeg = common::encode(&common::gradient(12, 12), ImageFormat::Jpeg);
    let source = ImageSource::from_bytes(&jpeg, None).unwrap();
    assert_eq!(source.mime(), "image/jpeg");
    assert!(source.data_url().starts_with("data:image/jpeg;base64,"));
}

#[test]
fn app_walkthrough() {
    let (mut app, _) = App::new(AppConfig {
        download: DownloadPolicy::Result,
        ..AppConfig::default()
    });

    let source = ImageSource::from_image(common::gradient(24, 24)).unwrap();
    let _ = app.update(Message::ImageLoaded(Ok(source)));
    let _ = app.update(Message::ParamChanged(patch_upscaler::params::ParamKind::PatchSize, 8.0));
    let _ = app.update(Message::Upscale);
    assert!(app.is_busy());

    let request = app.job().cloned().unwrap();
    assert_eq!(request.tiling, TilingOptions { patch_size: 8, padding: 2 });

    let mut events = Vec::new();
    job::execute(&request, &CancellationToken::new(), &mut |e| events.push(e));
    for event in events {
        let _ = app.update(Message::Job(request.id, event));
    }

    assert!(!app.is_busy());
    assert!(app.can_download());
    assert_eq!(app.progress().grid(), (3, 3));
    assert_eq!(app.progress().percentage(), 100);
    assert_eq!(app.progress().table().rows().len(), 3);
    assert_eq!(app.upscaled().unwrap().image().dimensions(), (48, 48));
}
