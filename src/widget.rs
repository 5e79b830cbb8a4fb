pub mod comment_widget;
