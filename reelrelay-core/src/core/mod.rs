pub mod video_id;
