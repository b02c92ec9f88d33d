fn main() -> anyhow::Result<()> {
    pointcloud_recorder_lib::run()
}
